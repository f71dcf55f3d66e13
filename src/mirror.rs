//! lftp mirror invocation
//!
//! lftp is called with an argument vector. The only text it parses itself is
//! the `-e` script, so each script token is quoted for lftp's command parser.

use crate::config::Config;
use crate::excludes::ExcludeList;
use crate::runner::Invocation;

/// Mirroring tool binary
pub const LFTP_PROGRAM: &str = "lftp";

/// Files transferred in parallel
pub const PARALLEL_TRANSFERS: u32 = 5;

/// Segments used for each single-file transfer
pub const SEGMENTS_PER_FILE: u32 = 5;

/// Build the `mirror ...; quit` script passed to `lftp -e`
pub fn mirror_script(config: &Config, excludes: &ExcludeList) -> String {
    let mut tokens = vec![
        "mirror".to_string(),
        "--continue".to_string(),
        "--verbose".to_string(),
        "--delete".to_string(),
        format!("--parallel={}", PARALLEL_TRANSFERS),
        format!("--use-pget-n={}", SEGMENTS_PER_FILE),
    ];
    tokens.extend(excludes.to_args().iter().map(|arg| quote_lftp(arg)));
    tokens.push(quote_lftp(&config.source_dir));
    tokens.push(quote_lftp(&config.target_dir.to_string_lossy()));

    format!("{}; quit", tokens.join(" "))
}

/// `sftp://host:port` connection target
pub fn sftp_url(config: &Config) -> String {
    format!("sftp://{}:{}", config.source_hostname, config.ssh_port)
}

/// Full lftp invocation for one mirror pass
pub fn mirror_invocation(config: &Config, excludes: &ExcludeList) -> Invocation {
    Invocation::new(LFTP_PROGRAM)
        .arg("-u")
        .arg(format!("{},{}", config.ssh_username, config.ssh_password))
        .arg("-e")
        .arg(mirror_script(config, excludes))
        .arg(sftp_url(config))
        .secret(config.ssh_password.clone())
}

/// Quote a token for lftp's command-line parser.
///
/// Plain tokens pass through unchanged. Anything holding whitespace, quotes,
/// backslashes or lftp metacharacters is wrapped in double quotes with `"` and
/// `\` backslash-escaped, so the token reaches `mirror` byte for byte.
pub fn quote_lftp(token: &str) -> String {
    let needs_quoting = token.is_empty()
        || token.chars().any(|c| {
            c.is_whitespace()
                || matches!(c, '"' | '\'' | '\\' | ';' | '&' | '|' | '#' | '>' | '<' | '(' | ')' | '`' | '!')
        });

    if !needs_quoting {
        return token.to_string();
    }

    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
