use super::{Session, HOME_DIR};

/// Marker the backend prints in front of the session we're running inside
const CURRENT_MARKER: &str = "\u{2192} ";

/// Parse the tab-separated `key=value` output of `<backend> list`.
///
/// Lines look like `session_name=foo\tpid=123\tclients=1\tstarted_in=~/bar`,
/// optionally indented or prefixed with the current-session arrow. Unknown
/// keys are ignored, bad numbers fall back to zero and lines without a
/// `session_name` are dropped. This never fails; garbage yields no sessions.
pub fn parse_sessions(output: &str) -> Vec<Session> {
    output.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<Session> {
    let line = line.trim();
    let line = line.strip_prefix(CURRENT_MARKER).unwrap_or(line).trim();
    if line.is_empty() {
        return None;
    }

    let mut name = None;
    let mut pid = None;
    let mut clients = 0;
    let mut started_in = HOME_DIR.to_string();

    for field in line.split('\t') {
        let Some((key, value)) = field.trim().split_once('=') else {
            continue;
        };
        match key {
            "session_name" => name = Some(value.to_string()),
            "pid" => pid = value.parse().ok().filter(|&p: &u32| p != 0),
            "clients" => clients = value.parse().unwrap_or(0),
            "started_in" => started_in = value.to_string(),
            _ => {}
        }
    }

    let name = name.filter(|n| !n.is_empty())?;
    Some(Session::new(name, pid, clients, started_in))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_real_output() {
        // Indented lines with extra fields, as printed by zmosh list
        let input = "  session_name=apcsp-1\tpid=1234\tclients=1\tcreated_at=1771652262707138000\ttask_ended_at=0\tstarted_in=~/GitHub/apcsp\n\
                     \x20 session_name=bbcli\tpid=5678\tclients=0\tcreated_at=1771642928511196000\tstarted_in=~/Documents/bbcli\n";

        let sessions = parse_sessions(input);
        assert_eq!(sessions.len(), 2);

        assert_eq!(sessions[0].name, "apcsp-1");
        assert_eq!(sessions[0].pid, Some(1234));
        assert_eq!(sessions[0].clients, 1);
        assert!(sessions[0].active());
        assert_eq!(sessions[0].started_in, "~/GitHub/apcsp");

        assert_eq!(sessions[1].name, "bbcli");
        assert!(!sessions[1].active());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_sessions("").is_empty());
        assert!(parse_sessions("\n   \n\t\n").is_empty());
    }

    #[test]
    fn test_missing_started_in_defaults_to_home() {
        let sessions = parse_sessions("session_name=test\tclients=0\n");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].started_in, "~");
        assert_eq!(sessions[0].pid, None);
    }

    #[test]
    fn test_skips_blank_lines() {
        let sessions = parse_sessions("\n\nsession_name=test\tclients=1\tstarted_in=~/foo\n\n");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].started_in, "~/foo");
    }

    #[test]
    fn test_current_session_arrow() {
        let input = "\u{2192} session_name=zpick\tpid=78409\tclients=1\tstarted_in=~/GitHub/zpick\n";
        let sessions = parse_sessions(input);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "zpick");
        assert_eq!(sessions[0].pid, Some(78409));
    }

    #[test]
    fn test_status_line_is_kept() {
        // Sessions being torn down carry a status field and a trailing note
        let sessions = parse_sessions("  session_name=old-session\tstatus=Timeout\t(cleaning up)\n");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "old-session");
        assert!(!sessions[0].active());
    }

    #[test]
    fn test_bad_numbers_default_to_zero() {
        let sessions = parse_sessions("session_name=x\tpid=abc\tclients=-3\n");
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].pid, None);
        assert_eq!(sessions[0].clients, 0);
        assert!(!sessions[0].active());
    }

    #[test]
    fn test_lines_without_name_are_dropped() {
        let input = "pid=1\tclients=2\nsession_name=\tclients=1\nnot a record\nsession_name=ok\n";
        let sessions = parse_sessions(input);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].name, "ok");
    }

    #[test]
    fn test_order_is_preserved() {
        let input = "session_name=zeta\nsession_name=alpha\nsession_name=mid\n";
        let names: Vec<_> = parse_sessions(input).into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }
}
