//! Local move selection: fixed-depth minimax with alpha-beta pruning.
//!
//! This is the fallback behind the external engine and the whole of the
//! low-difficulty tiers. Positions are explored by cloning the board and
//! playing the candidate, the reversible-application idiom of cozy-chess.

use cozy_chess::{Board, Color, GameStatus, Move};

use chess_common::format_uci_move;

use crate::eval::evaluate;

const INFINITY: i32 = 1_000_000;

pub struct SearchEngine {
    depth: u8,
}

/// A ranked first-ply candidate from [`SearchEngine::suggestions`].
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub mv: Move,
    pub uci: String,
    pub evaluation: i32,
}

impl SearchEngine {
    pub fn new(depth: u8) -> Self {
        Self {
            depth: depth.max(1),
        }
    }

    /// Best move for the side to move, or `None` if the position is terminal.
    ///
    /// Black maximizes and White minimizes (the evaluation favors Black when
    /// positive); ties keep the first move in enumeration order.
    pub fn best_move(&self, board: &Board) -> Option<Move> {
        let black_to_move = board.side_to_move() == Color::Black;
        let mut best: Option<(Move, i32)> = None;

        for mv in legal_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);
            let value = minimax(
                &child,
                self.depth,
                -INFINITY,
                INFINITY,
                child.side_to_move() == Color::Black,
            );

            let better = match best {
                None => true,
                Some((_, best_value)) => {
                    if black_to_move {
                        value > best_value
                    } else {
                        value < best_value
                    }
                }
            };
            if better {
                best = Some((mv, value));
            }
        }

        best.map(|(mv, _)| mv)
    }

    /// Rank every legal move by the static evaluation one ply deep, best
    /// first for the side to move, returning the top `count`.
    pub fn suggestions(&self, board: &Board, count: usize) -> Vec<Suggestion> {
        let mut ranked: Vec<Suggestion> = legal_moves(board)
            .into_iter()
            .map(|mv| {
                let mut child = board.clone();
                child.play_unchecked(mv);
                Suggestion {
                    mv,
                    uci: format_uci_move(mv),
                    evaluation: evaluate(&child),
                }
            })
            .collect();

        if board.side_to_move() == Color::Black {
            ranked.sort_by(|a, b| b.evaluation.cmp(&a.evaluation));
        } else {
            ranked.sort_by(|a, b| a.evaluation.cmp(&b.evaluation));
        }
        ranked.truncate(count);
        ranked
    }
}

fn minimax(board: &Board, depth: u8, mut alpha: i32, mut beta: i32, maximizing: bool) -> i32 {
    if depth == 0 || board.status() != GameStatus::Ongoing {
        return evaluate(board);
    }

    if maximizing {
        let mut best = -INFINITY;
        for mv in legal_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);
            let value = minimax(&child, depth - 1, alpha, beta, false);
            best = best.max(value);
            alpha = alpha.max(value);
            if beta <= alpha {
                break;
            }
        }
        best
    } else {
        let mut best = INFINITY;
        for mv in legal_moves(board) {
            let mut child = board.clone();
            child.play_unchecked(mv);
            let value = minimax(&child, depth - 1, alpha, beta, true);
            best = best.min(value);
            beta = beta.min(value);
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// One-shot static report for a bare position: evaluation, search-chosen
/// best move, and the terminal flags a client cares about.
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    pub fen: String,
    pub evaluation: i32,
    pub best_move: Option<String>,
    pub legal_move_count: usize,
    pub in_check: bool,
    pub is_checkmate: bool,
    pub is_draw: bool,
}

pub fn analyze_position(board: &Board, depth: u8) -> PositionAnalysis {
    let legal = legal_moves(board);
    let in_check = !board.checkers().is_empty();
    let status = board.status();

    PositionAnalysis {
        fen: board.to_string(),
        evaluation: evaluate(board),
        best_move: SearchEngine::new(depth)
            .best_move(board)
            .map(format_uci_move),
        legal_move_count: legal.len(),
        in_check,
        is_checkmate: status == GameStatus::Won,
        is_draw: status == GameStatus::Drawn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    /// Unpruned reference implementation for the pruning-equivalence test.
    fn plain_minimax(board: &Board, depth: u8, maximizing: bool) -> i32 {
        if depth == 0 || board.status() != GameStatus::Ongoing {
            return evaluate(board);
        }
        let values = legal_moves(board).into_iter().map(|mv| {
            let mut child = board.clone();
            child.play_unchecked(mv);
            plain_minimax(&child, depth - 1, !maximizing)
        });
        if maximizing {
            values.max().unwrap_or(-INFINITY)
        } else {
            values.min().unwrap_or(INFINITY)
        }
    }

    #[test]
    fn test_pruning_does_not_change_the_score() {
        let positions = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R b KQkq - 3 3",
            "k7/8/8/3q4/3Q4/8/8/K7 b - - 0 1",
            "8/5P1k/8/8/8/8/8/4K3 w - - 0 1",
        ];
        for fen in positions {
            let b = board(fen);
            for depth in 1..=3 {
                for maximizing in [true, false] {
                    assert_eq!(
                        minimax(&b, depth, -INFINITY, INFINITY, maximizing),
                        plain_minimax(&b, depth, maximizing),
                        "divergence at {fen} depth {depth}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_black_takes_the_hanging_queen() {
        let b = board("k7/8/8/3q4/3Q4/8/8/K7 b - - 0 1");
        let best = SearchEngine::new(2).best_move(&b).unwrap();
        assert_eq!(format_uci_move(best), "d5d4");
    }

    #[test]
    fn test_white_takes_the_hanging_queen() {
        let b = board("k7/8/8/3q4/3Q4/8/8/K7 w - - 0 1");
        let best = SearchEngine::new(2).best_move(&b).unwrap();
        assert_eq!(format_uci_move(best), "d4d5");
    }

    #[test]
    fn test_terminal_position_has_no_move() {
        let b = board("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(SearchEngine::new(2).best_move(&b).is_none());
    }

    #[test]
    fn test_suggestions_are_sorted_for_the_side_to_move() {
        let b = board("k7/8/8/3q4/3Q4/8/8/K7 b - - 0 1");
        let ranked = SearchEngine::new(2).suggestions(&b, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].uci, "d5d4");
        assert!(ranked[0].evaluation >= ranked[1].evaluation);
        assert!(ranked[1].evaluation >= ranked[2].evaluation);
    }

    #[test]
    fn test_analyze_position_reports_checkmate() {
        let report = analyze_position(
            &board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"),
            2,
        );
        assert!(report.is_checkmate);
        assert_eq!(report.legal_move_count, 0);
        assert!(report.best_move.is_none());
        assert_eq!(report.evaluation, crate::eval::MATE_SCORE);
    }
}
