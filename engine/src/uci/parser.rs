use crate::{EngineInfo, Score};
use chess_common::parse_uci_move;
use cozy_chess::Move;

/// Incoming message from a UCI engine
#[derive(Debug, Clone)]
pub enum UciMessage {
    Id { value: String },
    UciOk,
    ReadyOk,
    /// `None` when the engine reports "(none)" or resigns instead of a move.
    BestMove { mv: Option<Move> },
    Info(EngineInfo),
}

/// Parse one line of engine output.
pub fn parse_uci_message(line: &str) -> Result<UciMessage, crate::UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(crate::UciError::MalformedMessage(line.to_string()));
            }
            Ok(UciMessage::Id {
                value: tokens[1..].join(" "),
            })
        }

        Some(&"bestmove") => {
            let token = tokens
                .get(1)
                .ok_or_else(|| crate::UciError::MalformedMessage(line.to_string()))?;
            // "(none)" and resignation tokens are sentinels, not moves.
            let mv = match *token {
                "(none)" | "0000" | "resign" => None,
                t => Some(parse_uci_move(t)?),
            };
            Ok(UciMessage::BestMove { mv })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(crate::UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse an "info" line. Unknown keywords are skipped; only the metadata the
/// bridge reports (depth, time, nodes, score) is kept.
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(Score::Centipawns),
                            "mate" => value_str.parse().ok().map(Score::Mate),
                            _ => None,
                        };
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::format_uci_move;

    #[test]
    fn test_parse_bestmove() {
        let msg = parse_uci_message("bestmove e2e4 ponder e7e5").unwrap();
        match msg {
            UciMessage::BestMove { mv: Some(mv) } => {
                assert_eq!(format_uci_move(mv), "e2e4");
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_bestmove_none_is_sentinel() {
        for line in ["bestmove (none)", "bestmove 0000", "bestmove resign"] {
            match parse_uci_message(line).unwrap() {
                UciMessage::BestMove { mv: None } => {}
                other => panic!("Expected sentinel for {line:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_info() {
        let msg = parse_uci_message("info depth 12 score cp 35 nodes 15234 pv e2e4 e7e5").unwrap();
        match msg {
            UciMessage::Info(info) => {
                assert_eq!(info.depth, Some(12));
                assert!(matches!(info.score, Some(Score::Centipawns(35))));
                assert_eq!(info.nodes, Some(15234));
            }
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_parse_info_mate_score() {
        let msg = parse_uci_message("info depth 8 score mate -3").unwrap();
        match msg {
            UciMessage::Info(info) => assert!(matches!(info.score, Some(Score::Mate(-3)))),
            _ => panic!("Wrong message type"),
        }
    }

    #[test]
    fn test_unknown_line_is_an_error() {
        assert!(parse_uci_message("option name Hash type spin").is_err());
        assert!(parse_uci_message("").is_err());
    }
}
