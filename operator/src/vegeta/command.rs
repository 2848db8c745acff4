//! Compiles a load test spec into the shell commands run by its job.
use crate::vegeta::spec::{AttackSpec, BlobStorageProvider, ReportSpec, VegetaSpec};

/// Output sentinel that writes to the console instead of a file.
pub const STDOUT_OUTPUT: &str = "stdout";

const VEGETA_BIN: &str = "vegeta";
const RCLONE_BIN: &str = "rclone";
const PIPE: &str = "|";

/// Value of an optional field and the rule that decides whether its flag is emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlagValue<'a> {
    /// Bare flag, emitted only when true.
    Switch(Option<bool>),
    /// Flag and argument, emitted only when not empty.
    Text(Option<&'a str>),
    /// Flag and argument, emitted only when strictly greater than zero.
    Positive(Option<i128>),
    /// Flag and argument, emitted only when not zero. Negative values are meaningful.
    NonZero(Option<i128>),
}

impl FlagValue<'_> {
    /// Serialize into zero or one flag with its optional argument.
    ///
    /// Values are passed through untouched, the load tool validates them when it runs.
    pub fn serialize(self, flag: &'static str) -> Option<(&'static str, Option<String>)> {
        match self {
            FlagValue::Switch(value) => value.filter(|on| *on).map(|_| (flag, None)),
            FlagValue::Text(value) => value
                .filter(|value| !value.is_empty())
                .map(|value| (flag, Some(value.to_owned()))),
            FlagValue::Positive(value) => value
                .filter(|value| *value > 0)
                .map(|value| (flag, Some(value.to_string()))),
            FlagValue::NonZero(value) => value
                .filter(|value| *value != 0)
                .map(|value| (flag, Some(value.to_string()))),
        }
    }
}

fn text(value: &Option<String>) -> FlagValue<'_> {
    FlagValue::Text(value.as_deref())
}

fn positive(value: Option<impl Into<i128>>) -> FlagValue<'static> {
    FlagValue::Positive(value.map(Into::into))
}

fn non_zero(value: Option<impl Into<i128>>) -> FlagValue<'static> {
    FlagValue::NonZero(value.map(Into::into))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

// Flags of the attack verb in declaration order of the spec.
fn attack_flags(attack: &AttackSpec) -> [(&'static str, FlagValue<'_>); 26] {
    [
        ("-body", text(&attack.body)),
        ("-cert", text(&attack.cert)),
        ("-chunked", FlagValue::Switch(attack.chunked)),
        ("-connections", positive(attack.connections)),
        ("-duration", text(&attack.duration)),
        ("-h2c", FlagValue::Switch(attack.h2c)),
        ("-header", text(&attack.header)),
        ("-http2", FlagValue::Switch(attack.http2)),
        ("-insecure", FlagValue::Switch(attack.insecure)),
        ("-keepalive", FlagValue::Switch(attack.keep_alive)),
        ("-key", text(&attack.key)),
        ("-laddr", text(&attack.laddr)),
        ("-lazy", FlagValue::Switch(attack.lazy)),
        ("-max-body", non_zero(attack.max_body)),
        ("-max-workers", non_zero(attack.max_workers)),
        ("-name", text(&attack.name)),
        ("-output", text(&attack.output)),
        ("-proxy-header", text(&attack.proxy_header)),
        ("-rate", text(&attack.rate)),
        ("-redirects", non_zero(attack.redirects)),
        ("-resolvers", text(&attack.resolvers)),
        ("-root-certs", text(&attack.root_certs)),
        ("-targets", text(&attack.targets)),
        ("-timeout", text(&attack.timeout)),
        ("-unix-socket", text(&attack.unix_socket)),
        ("-workers", positive(attack.workers)),
    ]
}

fn report_flags(report: &ReportSpec) -> [(&'static str, FlagValue<'_>); 4] {
    [
        ("-buckets", text(&report.buckets)),
        ("-every", text(&report.every)),
        ("-output", text(&report.output)),
        ("-type", text(&report.report_type)),
    ]
}

fn push_flags<'a>(
    command: &mut Vec<String>,
    flags: impl IntoIterator<Item = (&'static str, FlagValue<'a>)>,
) {
    for (flag, value) in flags {
        if let Some((flag, arg)) = value.serialize(flag) {
            command.push(flag.to_owned());
            command.extend(arg);
        }
    }
}

/// Compile the attack command, piped into a report when one is requested.
///
/// The returned tokens form a single shell command line once joined with spaces.
/// Flag values are passed to the shell untouched, so values holding spaces or
/// shell metacharacters must carry their own quoting.
pub fn attack_command(spec: &VegetaSpec) -> Vec<String> {
    let mut command = Vec::new();

    // A single target is fed to the attack on stdin.
    if let Some(target) = non_empty(&spec.target) {
        command.extend([
            "echo".to_owned(),
            format!("\"GET \"{target}\"\""),
            PIPE.to_owned(),
        ]);
    }

    command.extend([VEGETA_BIN, "attack"].map(str::to_owned));
    push_flags(&mut command, attack_flags(&spec.attack));

    // Writing the results to a file and reporting on them are mutually exclusive.
    if non_empty(&spec.attack.output).is_none() {
        if let Some(report) = &spec.attack.report {
            command.extend([PIPE, VEGETA_BIN, "report"].map(str::to_owned));
            push_flags(&mut command, report_flags(report));
        }
    }

    command
}

/// Resolve the file an attack leaves behind: its own output, otherwise the report output.
///
/// Returns None when results only go to the console.
pub fn report_destination(spec: &VegetaSpec) -> Option<&str> {
    non_empty(&spec.attack.output)
        .or_else(|| {
            spec.attack
                .report
                .as_ref()
                .and_then(|report| non_empty(&report.output))
        })
        .filter(|output| *output != STDOUT_OUTPUT)
}

/// Compile the command that copies the report file to blob storage.
///
/// Returns None when there is no blob storage or no report file to copy.
pub fn export_command(spec: &VegetaSpec) -> Option<Vec<String>> {
    let blob_storage = spec.blob_storage.as_ref()?;
    let report = report_destination(spec)?;

    // A null config keeps rclone from caching credentials on disk.
    let mut command: Vec<String> = [RCLONE_BIN, "--config", "/dev/null", "copy", report]
        .map(str::to_owned)
        .to_vec();
    match blob_storage.provider {
        BlobStorageProvider::Aws => command.extend([
            "--s3-env-auth".to_owned(),
            format!("s3:{}", blob_storage.name),
        ]),
    }
    Some(command)
}
