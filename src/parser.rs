//! Trace record parsing: one strace log line to one typed syscall event
//!
//! The log format is `<pid><whitespace><call>(<args>...`, as written by
//! `strace -f -o FILE`. Only the five syscalls that affect the dependency
//! picture are decoded; everything else, including strace chatter like
//! `+++ exited with 0 +++` and `<... resumed>` fragments, is dropped
//! silently. A malformed line must never abort the detection pass.

/// One decoded filesystem-affecting syscall observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// `open("<path>", <flags>)` - classified by its access-mode flags.
    Open { pid: u32, path: String, flags: String },
    /// `creat("<path>", ...)` - always an output.
    Create { pid: u32, path: String },
    /// `rename("<from>", "<to>")`.
    Rename { pid: u32, from: String, to: String },
    /// `mkdir("<path>", <octal-mode>)`.
    Mkdir { pid: u32, path: String },
    /// `chdir("<path>")` - updates the pid's tracked directory.
    Chdir { pid: u32, path: String },
}

impl TraceEvent {
    /// Pid of the process that issued the call.
    pub fn pid(&self) -> u32 {
        match *self {
            TraceEvent::Open { pid, .. }
            | TraceEvent::Create { pid, .. }
            | TraceEvent::Rename { pid, .. }
            | TraceEvent::Mkdir { pid, .. }
            | TraceEvent::Chdir { pid, .. } => pid,
        }
    }
}

/// Parse one raw trace line, returning `None` for anything that is not a
/// well-formed record of the five tracked syscalls.
pub fn parse_line(line: &str) -> Option<TraceEvent> {
    let line = line.trim_start();
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let pid: u32 = line[..digits].parse().ok()?;
    let rest = &line[digits..];
    // The pid must be its own token.
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();

    let paren = rest.find('(')?;
    let keyword = &rest[..paren];
    let args = &rest[paren + 1..];

    // Exact keyword match: "openat" and friends are intentionally not here.
    match keyword {
        "open" => {
            let (path, after) = quoted(args)?;
            let flags = token_after_comma(after)?;
            Some(TraceEvent::Open {
                pid,
                path: path.to_string(),
                flags: flags.to_string(),
            })
        }
        "creat" => {
            let (path, _) = quoted(args)?;
            Some(TraceEvent::Create {
                pid,
                path: path.to_string(),
            })
        }
        "rename" => {
            let (from, after) = quoted(args)?;
            let after = after.strip_prefix(',')?.trim_start();
            let (to, _) = quoted(after)?;
            Some(TraceEvent::Rename {
                pid,
                from: from.to_string(),
                to: to.to_string(),
            })
        }
        "mkdir" => {
            let (path, after) = quoted(args)?;
            let mode = token_after_comma(after)?;
            // The mode must look like an octal literal, but classification
            // does not use it.
            u32::from_str_radix(mode, 8).ok()?;
            Some(TraceEvent::Mkdir {
                pid,
                path: path.to_string(),
            })
        }
        "chdir" => {
            let (path, _) = quoted(args)?;
            Some(TraceEvent::Chdir {
                pid,
                path: path.to_string(),
            })
        }
        _ => None,
    }
}

/// Extract a leading double-quoted string, returning the contents and the
/// remainder after the closing quote.
fn quoted(s: &str) -> Option<(&str, &str)> {
    let s = s.strip_prefix('"')?;
    let end = s.find('"')?;
    Some((&s[..end], &s[end + 1..]))
}

/// Skip a comma and take the next bare token (up to `,`, `)`, or whitespace).
fn token_after_comma(s: &str) -> Option<&str> {
    let s = s.strip_prefix(',')?.trim_start();
    let end = s
        .find(|c: char| c == ',' || c == ')' || c.is_whitespace())
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some(&s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_with_flags() {
        let event = parse_line("1234  open(\"/src/main.c\", O_RDONLY) = 3").unwrap();
        assert_eq!(
            event,
            TraceEvent::Open {
                pid: 1234,
                path: "/src/main.c".to_string(),
                flags: "O_RDONLY".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_open_multi_flag() {
        let event = parse_line("7 open(\"out.o\", O_WRONLY|O_CREAT|O_TRUNC, 0644) = 4").unwrap();
        assert_eq!(
            event,
            TraceEvent::Open {
                pid: 7,
                path: "out.o".to_string(),
                flags: "O_WRONLY|O_CREAT|O_TRUNC".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_creat() {
        let event = parse_line("42 creat(\"/work/new\", 0644) = 5").unwrap();
        assert_eq!(
            event,
            TraceEvent::Create {
                pid: 42,
                path: "/work/new".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rename() {
        let event = parse_line("9 rename(\"/a/tmp\", \"/a/final\") = 0").unwrap();
        assert_eq!(
            event,
            TraceEvent::Rename {
                pid: 9,
                from: "/a/tmp".to_string(),
                to: "/a/final".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_mkdir() {
        let event = parse_line("9 mkdir(\"objs\", 0755) = 0").unwrap();
        assert_eq!(
            event,
            TraceEvent::Mkdir {
                pid: 9,
                path: "objs".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_mkdir_rejects_non_octal_mode() {
        assert_eq!(parse_line("9 mkdir(\"objs\", mode) = 0"), None);
        assert_eq!(parse_line("9 mkdir(\"objs\", 0x1ff) = 0"), None);
    }

    #[test]
    fn test_parse_chdir() {
        let event = parse_line("5 chdir(\"/src\") = 0").unwrap();
        assert_eq!(
            event,
            TraceEvent::Chdir {
                pid: 5,
                path: "/src".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_requires_pid_prefix() {
        assert_eq!(parse_line("open(\"/x\", O_RDONLY) = 3"), None);
        assert_eq!(parse_line("pid open(\"/x\", O_RDONLY) = 3"), None);
    }

    #[test]
    fn test_parse_pid_must_be_own_token() {
        assert_eq!(parse_line("12open(\"/x\", O_RDONLY) = 3"), None);
    }

    #[test]
    fn test_parse_unmodeled_syscalls_discarded() {
        assert_eq!(parse_line("3 openat(AT_FDCWD, \"/x\", O_RDONLY) = 3"), None);
        assert_eq!(parse_line("3 close(3) = 0"), None);
        assert_eq!(parse_line("3 renameat2(AT_FDCWD, \"a\", AT_FDCWD, \"b\", 0) = 0"), None);
    }

    #[test]
    fn test_parse_strace_chatter_discarded() {
        assert_eq!(parse_line("1234  +++ exited with 0 +++"), None);
        assert_eq!(parse_line("1234  --- SIGCHLD {si_signo=SIGCHLD} ---"), None);
        assert_eq!(parse_line("1234  <... open resumed>) = 3"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_parse_open_with_malformed_args_discarded() {
        // Keyword matches but the argument shape does not: silent drop.
        assert_eq!(parse_line("3 open(3, O_RDONLY) = 0"), None);
        assert_eq!(parse_line("3 open(\"/x\") = 0"), None);
        assert_eq!(parse_line("3 open(\"/x) = 0"), None);
    }

    #[test]
    fn test_parse_unfinished_open_still_decodes() {
        // An unfinished line keeps the full argument list, so it decodes.
        let event = parse_line("8 open(\"/x\", O_RDONLY <unfinished ...>").unwrap();
        assert_eq!(event.pid(), 8);
    }

    #[test]
    fn test_event_pid_accessor() {
        let event = parse_line("77 chdir(\"/\") = 0").unwrap();
        assert_eq!(event.pid(), 77);
    }
}
