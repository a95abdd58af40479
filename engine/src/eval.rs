//! Static position evaluation.
//!
//! Sign convention: positive favors Black. Every piece contributes
//! `value * (-1 if white else +1)`, so the search maximizes for Black and
//! minimizes for White. Checkmate collapses to the mate sentinel keyed by the
//! side to move (the mated side's opponent gets the favorable sign), draws
//! to 0.

use cozy_chess::{Board, Color, GameStatus, Piece, Square};

/// Checkmate sentinel; dominates any material total.
pub const MATE_SCORE: i32 = 999_900;

pub fn evaluate(board: &Board) -> i32 {
    match board.status() {
        GameStatus::Won => match board.side_to_move() {
            // The side to move has been checkmated.
            Color::White => MATE_SCORE,
            Color::Black => -MATE_SCORE,
        },
        GameStatus::Drawn => 0,
        GameStatus::Ongoing => material_and_position(board),
    }
}

fn material_and_position(board: &Board) -> i32 {
    let mut score = 0;

    for &color in &Color::ALL {
        let sign = match color {
            Color::White => -1,
            Color::Black => 1,
        };
        for &piece in &Piece::ALL {
            for sq in board.colors(color) & board.pieces(piece) {
                score += sign * (piece_value(piece) + positional_bonus(piece, sq, color));
            }
        }
    }

    score
}

/// Standard relative weights, in centipawns.
pub fn piece_value(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 300,
        Piece::Bishop => 300,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Development bonuses for pawns and knights, mirrored by rank per side.
fn positional_bonus(piece: Piece, sq: Square, color: Color) -> i32 {
    let rank = sq.rank() as usize;
    let file = sq.file() as usize;
    // Table row 0 is the opponent's back rank from the mover's perspective.
    let row = match color {
        Color::White => 7 - rank,
        Color::Black => rank,
    };

    match piece {
        Piece::Pawn => PAWN_TABLE[row][file],
        Piece::Knight => KNIGHT_TABLE[row][file],
        _ => 0,
    }
}

#[rustfmt::skip]
const PAWN_TABLE: [[i32; 8]; 8] = [
    [ 0,  0,  0,   0,   0,  0,  0,  0],
    [50, 50, 50,  50,  50, 50, 50, 50],
    [10, 10, 20,  30,  30, 20, 10, 10],
    [ 5,  5, 10,  25,  25, 10,  5,  5],
    [ 0,  0,  0,  20,  20,  0,  0,  0],
    [ 5, -5, -10,  0,   0, -10, -5, 5],
    [ 5, 10, 10, -20, -20, 10, 10,  5],
    [ 0,  0,  0,   0,   0,  0,  0,  0],
];

#[rustfmt::skip]
const KNIGHT_TABLE: [[i32; 8]; 8] = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20,   0,   0,   0,   0, -20, -40],
    [-30,   0,  10,  15,  15,  10,   0, -30],
    [-30,   5,  15,  20,  20,  15,   5, -30],
    [-30,   0,  15,  20,  20,  15,   0, -30],
    [-30,   5,  10,  15,  15,  10,   5, -30],
    [-40, -20,   0,   5,   5,   0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    #[test]
    fn test_start_position_is_balanced() {
        assert_eq!(evaluate(&Board::default()), 0);
    }

    #[test]
    fn test_material_deficit_favors_black() {
        // White is missing a queen.
        let b = board("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR w KQkq - 0 1");
        assert!(evaluate(&b) >= 900);
    }

    #[test]
    fn test_checkmate_scores_for_the_winner() {
        // Fool's mate: white to move, checkmated.
        let b = board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert_eq!(evaluate(&b), MATE_SCORE);
    }

    #[test]
    fn test_stalemate_scores_zero() {
        let b = board("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert_eq!(evaluate(&b), 0);
    }

    #[test]
    fn test_antisymmetric_under_color_mirror() {
        // The same shape with colors swapped and ranks flipped must negate.
        let pairs = [
            (
                "4k3/8/8/3N4/8/8/8/4K3 w - - 0 1",
                "4k3/8/8/8/3n4/8/8/4K3 w - - 0 1",
            ),
            (
                "4k3/8/8/8/4P3/8/8/4K3 w - - 0 1",
                "4k3/8/8/4p3/8/8/8/4K3 w - - 0 1",
            ),
            (
                "4k3/pppp4/8/8/8/8/PP6/4K3 w - - 0 1",
                "4k3/pp6/8/8/8/8/PPPP4/4K3 w - - 0 1",
            ),
        ];
        for (white_side, black_side) in pairs {
            assert_eq!(
                evaluate(&board(white_side)),
                -evaluate(&board(black_side)),
                "mirror of {white_side}"
            );
        }
    }

    #[test]
    fn test_advanced_pawn_outscores_home_pawn() {
        let home = board("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
        let advanced = board("4k3/8/4P3/8/8/8/8/4K3 w - - 0 1");
        // Scores favor black, so a better white pawn is more negative.
        assert!(evaluate(&advanced) < evaluate(&home));
    }
}
