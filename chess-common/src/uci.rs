//! UCI move-token parsing and formatting ("e2e4", "e7e8q").

use cozy_chess::{File, Move, Rank, Square};

use crate::converters::{format_piece, format_square, parse_piece, parse_square};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveTokenError {
    #[error("invalid move token: {0}")]
    InvalidMove(String),
    #[error("invalid square in move token: {0}")]
    InvalidSquare(String),
    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(String),
}

/// Format a move in UCI notation.
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Parse a UCI move token into a move.
pub fn parse_uci_move(s: &str) -> Result<Move, MoveTokenError> {
    if s.len() < 4 || s.len() > 5 {
        return Err(MoveTokenError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2]).ok_or_else(|| MoveTokenError::InvalidSquare(s.to_string()))?;
    let to = parse_square(&s[2..4]).ok_or_else(|| MoveTokenError::InvalidSquare(s.to_string()))?;

    let promotion = match s.get(4..5) {
        Some(p) => Some(
            p.chars()
                .next()
                .and_then(parse_piece)
                .ok_or_else(|| MoveTokenError::InvalidPromotion(s.to_string()))?,
        ),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Convert UCI castling notation to cozy_chess notation.
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8.
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8.
///
/// Checks whether the move looks like a UCI castling move and, if the
/// converted form is actually legal, returns the cozy_chess encoding.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let target_square = match (mv.from.rank(), mv.to.file()) {
            (Rank::First, File::G) => Square::new(File::H, Rank::First),
            (Rank::First, File::C) => Square::new(File::A, Rank::First),
            (Rank::Eighth, File::G) => Square::new(File::H, Rank::Eighth),
            (Rank::Eighth, File::C) => Square::new(File::A, Rank::Eighth),
            _ => return mv,
        };

        let converted = Move {
            from: mv.from,
            to: target_square,
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::Piece;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn test_parse_round_trip() {
        for token in ["e2e4", "g8f6", "e7e8q", "a7a8n"] {
            let mv = parse_uci_move(token).unwrap();
            assert_eq!(format_uci_move(mv), token);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_uci_move("e2").is_err());
        assert!(parse_uci_move("e2e9").is_err());
        assert!(parse_uci_move("e7e8x").is_err());
        assert!(parse_uci_move("e2e4e5").is_err());
    }
}
