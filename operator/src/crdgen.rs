use kube::CustomResourceExt;

use vegeta_operator::vegeta::Vegeta;

fn main() {
    print!("{}", serde_yaml::to_string(&Vegeta::crd()).unwrap());
}
