//! Command-line argument parsing.
//!
//! Usage:
//!   chatmsg [-f[<file>]] [-s<sender>] [-u<id>] [-p<param>] [-c<cmd>] [-e<esc>] [-qgordh] <text...>

use std::path::PathBuf;

pub const USAGE: &str =
    "Usage: chatmsg [-f[<file>]] [-s<sender>] [-u<id>] [-p<param>] [-c<cmd>] [-e<esc>] [-qgordh] <text...>";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// World description file.
    pub config: ConfigFile,
    /// Username the text is rendered for (`-s<name>`).
    pub sender: Option<String>,
    /// User id of the sender (`-u<id>`).
    pub user_id: Option<String>,
    /// Command argument (`-p<param>`).
    pub param: Option<String>,
    /// Command being answered (`-c<cmd>`).
    pub cmd: Option<String>,
    /// Escape string for song titles in the global pass (`-e<esc>`).
    pub escape: Option<String>,
    /// Quiet confirmations (`-q`).
    pub quiet: bool,
    /// Global placeholders only (`-g`).
    pub global_only: bool,
    /// Render as a text overlay (`-o`).
    pub overlay: bool,
    /// Perform real HTTP requests instead of the configured routes (`-r`).
    pub live_http: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Print usage and exit (`-h`).
    pub help: bool,
    /// The text to render (positional arguments joined by spaces).
    pub text: String,
}

/// How to choose the world file.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigFile {
    /// Search the user config directory, then `./chatmsg.rc` (default).
    #[default]
    Search,
    /// `-f` with no file argument: start from an empty world.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        // Flag argument: iterate over characters after the leading `-`.
        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'q' => args.quiet = true,
                'g' => args.global_only = true,
                'o' => args.overlay = true,
                'r' => args.live_http = true,
                'd' => args.debug = true,
                'h' => args.help = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.config = ConfigFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                c @ ('s' | 'u' | 'p' | 'c' | 'e') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{c} requires an argument"));
                    };
                    let slot = match c {
                        's' => &mut args.sender,
                        'u' => &mut args.user_id,
                        'p' => &mut args.param,
                        'c' => &mut args.cmd,
                        _ => &mut args.escape,
                    };
                    *slot = Some(value);
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    if positional.is_empty() && !args.help {
        return Err("missing text to render".to_owned());
    }
    args.text = positional.join(" ");
    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the world file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let user = directories::ProjectDirs::from("", "", "chatmsg").map(|d| d.config_dir().join("chatmsg.rc"));
    user.into_iter()
        .chain([PathBuf::from("./chatmsg.rc"), PathBuf::from("./.chatmsgrc")])
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn text_is_joined() {
        let a = parse_argv(&argv(&["Hi", "$sender!"])).unwrap();
        assert_eq!(a.text, "Hi $sender!");
        assert_eq!(a.config, ConfigFile::Search);
    }

    #[test]
    fn missing_text() {
        assert!(parse_argv(&argv(&["-q"])).is_err());
        assert!(parse_argv(&argv(&["-h"])).unwrap().help);
    }

    #[test]
    fn bool_flags_combined() {
        let a = parse_argv(&argv(&["-qgord", "x"])).unwrap();
        assert!(a.quiet && a.global_only && a.overlay && a.live_http && a.debug);
    }

    #[test]
    fn value_flags_embedded_and_separate() {
        let a = parse_argv(&argv(&["-sann", "-u", "42", "-p", "bob", "-c!hug", "$touser"])).unwrap();
        assert_eq!(a.sender.as_deref(), Some("ann"));
        assert_eq!(a.user_id.as_deref(), Some("42"));
        assert_eq!(a.param.as_deref(), Some("bob"));
        assert_eq!(a.cmd.as_deref(), Some("!hug"));
        assert_eq!(a.text, "$touser");
    }

    #[test]
    fn value_flag_after_switches() {
        let a = parse_argv(&argv(&["-ge\"", "$spotifySong"])).unwrap();
        assert!(a.global_only);
        assert_eq!(a.escape.as_deref(), Some("\""));
    }

    #[test]
    fn value_flag_without_value() {
        assert!(parse_argv(&argv(&["x", "-p"])).is_err());
    }

    #[test]
    fn config_forms() {
        assert_eq!(parse_argv(&argv(&["-f", "--", "x"])).unwrap().config, ConfigFile::Skip);
        assert_eq!(
            parse_argv(&argv(&["-fworld.rc", "x"])).unwrap().config,
            ConfigFile::Explicit(PathBuf::from("world.rc"))
        );
        assert_eq!(
            parse_argv(&argv(&["-f", "world.rc", "x"])).unwrap().config,
            ConfigFile::Explicit(PathBuf::from("world.rc"))
        );
    }

    #[test]
    fn double_dash_keeps_dashes() {
        let a = parse_argv(&argv(&["--", "-not-a-flag"])).unwrap();
        assert_eq!(a.text, "-not-a-flag");
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z", "x"])).is_err());
    }
}
