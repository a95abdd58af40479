use cozy_chess::{Board, Color, GameStatus, Move, Piece, Square};

use chess_common::format_piece_upper;

/// Main game state wrapper around a cozy-chess Board.
///
/// This is the rules boundary of the project: callers submit candidate moves
/// and receive either an applied history entry or a rejection, with the
/// position left untouched on rejection. Terminal detection (including the
/// history-dependent reasons cozy-chess does not track) lives here as well.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
    start_position: StartPosition,
    // Zobrist keys of every position seen, starting position included.
    position_hashes: Vec<u64>,
}

/// One applied move, recorded before and after effects are known.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub piece_color: Color,
    pub captured: Option<Piece>,
    pub promotion: Option<Piece>,
    pub is_castle: bool,
    pub is_check: bool,
    pub san: String,
    pub fen: String,
}

/// Starting position of the game
#[derive(Debug, Clone)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

/// Why a position is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    Checkmate,
    Stalemate,
    Repetition,
    InsufficientMaterial,
    FiftyMoveDraw,
}

impl TerminalReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::Repetition => "repetition",
            Self::InsufficientMaterial => "insufficient-material",
            Self::FiftyMoveDraw => "draw",
        }
    }
}

impl Game {
    /// Create a new game from the standard starting position
    pub fn new() -> Self {
        let position = Board::default();
        let hash = position.hash();
        Self {
            position,
            history: Vec::new(),
            start_position: StartPosition::Standard,
            position_hashes: vec![hash],
        }
    }

    /// Create a game from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = crate::fen::parse_fen(fen)?;
        let hash = position.hash();
        Ok(Self {
            position,
            history: Vec::new(),
            start_position: StartPosition::Fen(fen.to_string()),
            position_hashes: vec![hash],
        })
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Apply a move. Rejects illegal moves without mutating any state.
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        if !self.legal_moves().contains(&mv) {
            return Err(GameError::IllegalMove);
        }

        let piece = self
            .position
            .piece_on(mv.from)
            .ok_or(GameError::IllegalMove)?;
        let piece_color = self
            .position
            .color_on(mv.from)
            .ok_or(GameError::IllegalMove)?;

        // cozy-chess encodes castling as king-takes-own-rook.
        let is_castle =
            piece == Piece::King && self.position.color_on(mv.to) == Some(piece_color);

        let captured = if is_castle {
            None
        } else if piece == Piece::Pawn
            && mv.from.file() != mv.to.file()
            && self.position.piece_on(mv.to).is_none()
        {
            // En passant: the captured pawn is not on the destination square.
            Some(Piece::Pawn)
        } else {
            self.position.piece_on(mv.to)
        };

        let mut next = self.position.clone();
        next.play_unchecked(mv);

        let is_check = !next.checkers().is_empty();
        let is_checkmate = is_check && next.status() == GameStatus::Won;
        let san = generate_san(mv, piece, is_castle, captured.is_some(), is_check, is_checkmate);

        self.position = next;
        self.position_hashes.push(self.position.hash());
        let fen = self.to_fen();

        let entry = HistoryEntry {
            mv,
            from: mv.from,
            to: mv.to,
            piece,
            piece_color,
            captured,
            promotion: mv.promotion,
            is_castle,
            is_check,
            san,
            fen,
        };

        self.history.push(entry.clone());
        Ok(entry)
    }

    /// Undo the last move
    pub fn undo(&mut self) -> Result<(), GameError> {
        if self.history.is_empty() {
            return Err(GameError::NothingToUndo);
        }

        self.history.pop();
        self.position_hashes.pop();
        self.rebuild_position()?;
        Ok(())
    }

    /// Get all legal moves for the current position
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_reason().is_some()
    }

    /// Why the game is over, if it is.
    ///
    /// Checks the no-legal-move outcomes first, then the history-dependent
    /// draws: threefold repetition, insufficient material, fifty-move rule.
    pub fn terminal_reason(&self) -> Option<TerminalReason> {
        if self.legal_moves().is_empty() {
            return if self.position.checkers().is_empty() {
                Some(TerminalReason::Stalemate)
            } else {
                Some(TerminalReason::Checkmate)
            };
        }

        let current = self.position.hash();
        let seen = self
            .position_hashes
            .iter()
            .filter(|&&h| h == current)
            .count();
        if seen >= 3 {
            return Some(TerminalReason::Repetition);
        }

        if self.insufficient_material() {
            return Some(TerminalReason::InsufficientMaterial);
        }

        if self.position.halfmove_clock() >= 100 {
            return Some(TerminalReason::FiftyMoveDraw);
        }

        None
    }

    /// K vs K, K+minor vs K, and KB vs KB with same-colored bishops.
    fn insufficient_material(&self) -> bool {
        use cozy_chess::Piece as P;

        let board = &self.position;
        if !(board.pieces(P::Pawn).is_empty()
            && board.pieces(P::Rook).is_empty()
            && board.pieces(P::Queen).is_empty())
        {
            return false;
        }

        let knights = board.pieces(P::Knight).len();
        let bishops = board.pieces(P::Bishop).len();

        match knights + bishops {
            0 | 1 => true,
            2 if knights == 0 => {
                let mut colors = board.pieces(P::Bishop).into_iter().map(square_shade);
                let per_side = Color::ALL
                    .iter()
                    .all(|&c| (board.colors(c) & board.pieces(P::Bishop)).len() == 1);
                per_side && colors.next() == colors.next()
            }
            _ => false,
        }
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    /// Rebuild position from start + history (for undo)
    fn rebuild_position(&mut self) -> Result<(), GameError> {
        let mut board = match &self.start_position {
            StartPosition::Standard => Board::default(),
            StartPosition::Fen(fen) => crate::fen::parse_fen(fen)?,
        };

        for entry in &self.history {
            // History entries were validated when recorded.
            board.play_unchecked(entry.mv);
        }

        self.position = board;
        Ok(())
    }
}

fn square_shade(sq: Square) -> bool {
    (sq.file() as usize + sq.rank() as usize) % 2 == 0
}

/// Generate simplified SAN notation for a move (no disambiguation).
fn generate_san(
    mv: Move,
    piece: Piece,
    is_castle: bool,
    is_capture: bool,
    is_check: bool,
    is_checkmate: bool,
) -> String {
    let mut san = String::new();

    if is_castle {
        san.push_str(if (mv.to.file() as usize) > (mv.from.file() as usize) {
            "O-O"
        } else {
            "O-O-O"
        });
    } else {
        match piece {
            Piece::Pawn => {
                if is_capture {
                    san.push(file_to_char(mv.from));
                }
            }
            _ => san.push(format_piece_upper(piece)),
        }

        if is_capture {
            san.push('x');
        }

        san.push(file_to_char(mv.to));
        san.push(rank_to_char(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(format_piece_upper(promo));
        }
    }

    if is_checkmate {
        san.push('#');
    } else if is_check {
        san.push('+');
    }

    san
}

fn file_to_char(square: Square) -> char {
    match square.file() {
        cozy_chess::File::A => 'a',
        cozy_chess::File::B => 'b',
        cozy_chess::File::C => 'c',
        cozy_chess::File::D => 'd',
        cozy_chess::File::E => 'e',
        cozy_chess::File::F => 'f',
        cozy_chess::File::G => 'g',
        cozy_chess::File::H => 'h',
    }
}

fn rank_to_char(square: Square) -> char {
    match square.rank() {
        cozy_chess::Rank::First => '1',
        cozy_chess::Rank::Second => '2',
        cozy_chess::Rank::Third => '3',
        cozy_chess::Rank::Fourth => '4',
        cozy_chess::Rank::Fifth => '5',
        cozy_chess::Rank::Sixth => '6',
        cozy_chess::Rank::Seventh => '7',
        cozy_chess::Rank::Eighth => '8',
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("FEN parse error: {0}")]
    FenError(#[from] crate::fen::FenError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::parse_uci_move;

    fn play(game: &mut Game, moves: &[&str]) {
        for token in moves {
            let mv = parse_uci_move(token).unwrap();
            let mv = crate::uci::convert_uci_castling_to_cozy(mv, &game.legal_moves());
            game.make_move(mv).unwrap();
        }
    }

    #[test]
    fn test_illegal_move_leaves_state_untouched() {
        let mut game = Game::new();
        let before = game.to_fen();
        let result = game.make_move(parse_uci_move("e2e5").unwrap());
        assert!(matches!(result, Err(GameError::IllegalMove)));
        assert_eq!(game.to_fen(), before);
        assert!(game.history().is_empty());
    }

    #[test]
    fn test_capture_and_san() {
        let mut game = Game::new();
        play(&mut game, &["e2e4", "d7d5", "e4d5"]);
        let entry = game.history().last().unwrap();
        assert_eq!(entry.captured, Some(Piece::Pawn));
        assert_eq!(entry.san, "exd5");
    }

    #[test]
    fn test_en_passant_records_pawn_capture() {
        let mut game = Game::new();
        play(&mut game, &["e2e4", "a7a6", "e4e5", "d7d5", "e5d6"]);
        let entry = game.history().last().unwrap();
        assert_eq!(entry.captured, Some(Piece::Pawn));
        assert_eq!(entry.san, "exd6");
    }

    #[test]
    fn test_castle_san_and_flags() {
        let mut game = Game::new();
        play(
            &mut game,
            &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "e1g1"],
        );
        let entry = game.history().last().unwrap();
        assert!(entry.is_castle);
        assert_eq!(entry.captured, None);
        assert_eq!(entry.san, "O-O");
    }

    #[test]
    fn test_scholars_mate_is_checkmate() {
        let mut game = Game::new();
        play(
            &mut game,
            &["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6", "h5f7"],
        );
        assert!(game.is_terminal());
        assert_eq!(game.terminal_reason(), Some(TerminalReason::Checkmate));
        assert_eq!(TerminalReason::Checkmate.as_str(), "checkmate");
        let entry = game.history().last().unwrap();
        assert!(entry.is_check);
        assert_eq!(entry.san, "Qxf7#");
    }

    #[test]
    fn test_stalemate() {
        let game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(game.terminal_reason(), Some(TerminalReason::Stalemate));
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        // Knights shuffle back to the starting position twice.
        play(
            &mut game,
            &[
                "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8",
            ],
        );
        assert_eq!(game.terminal_reason(), Some(TerminalReason::Repetition));
    }

    #[test]
    fn test_insufficient_material() {
        let game = Game::from_fen("8/8/4k3/8/8/3NK3/8/8 w - - 0 1").unwrap();
        assert_eq!(
            game.terminal_reason(),
            Some(TerminalReason::InsufficientMaterial)
        );

        let game = Game::from_fen("8/8/4k3/8/8/3QK3/8/8 w - - 0 1").unwrap();
        assert!(game.terminal_reason().is_none());
    }

    #[test]
    fn test_fifty_move_draw() {
        let game = Game::from_fen("8/8/4k3/8/8/2R1K3/8/8 w - - 100 80").unwrap();
        assert_eq!(game.terminal_reason(), Some(TerminalReason::FiftyMoveDraw));
    }

    #[test]
    fn test_undo_restores_position() {
        let mut game = Game::new();
        let start = game.to_fen();
        play(&mut game, &["e2e4", "e7e5"]);
        game.undo().unwrap();
        game.undo().unwrap();
        assert_eq!(game.to_fen(), start);
        assert!(game.undo().is_err());
        // Repetition bookkeeping rewinds with the history.
        assert!(game.terminal_reason().is_none());
    }

    #[test]
    fn test_promotion_san() {
        let mut game = Game::from_fen("8/5P1k/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        play(&mut game, &["f7f8q"]);
        let entry = game.history().last().unwrap();
        assert_eq!(entry.promotion, Some(Piece::Queen));
        assert!(entry.san.starts_with("f8=Q"));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Any sequence of legal moves keeps the wrapper and the board in
        // agreement: FEN round-trips and undo rewinds to the start.
        #[test]
        fn random_playout_fen_round_trips(choices in proptest::collection::vec(0usize..64, 0..40)) {
            let mut game = Game::new();
            let start = game.to_fen();
            let mut applied = 0;

            for c in choices {
                let moves = game.legal_moves();
                if moves.is_empty() {
                    break;
                }
                let mv = moves[c % moves.len()];
                game.make_move(mv).unwrap();
                applied += 1;

                let fen = game.to_fen();
                let reparsed = Game::from_fen(&fen).unwrap();
                prop_assert_eq!(reparsed.to_fen(), fen);
            }

            for _ in 0..applied {
                game.undo().unwrap();
            }
            prop_assert_eq!(game.to_fen(), start);
        }
    }
}
