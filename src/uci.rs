//! Universal Chess Interface (UCI) protocol adapter: translates text
//! commands on stdin into `controller::Engine` calls and writes `info`/
//! `bestmove` lines back to stdout. Anything that isn't part of the
//! protocol itself (unexpected input, internal state) is logged via
//! `log` rather than printed, so it doesn't corrupt the protocol stream.

use std::io;
use std::time::Duration;

use crate::controller::Engine;
use crate::movegen;

const DEFAULT_MOVETIME: Duration = Duration::from_millis(5000);

pub struct UCI {
    engine: Engine,
}

impl UCI {
    pub fn new() -> UCI {
        UCI {
            engine: Engine::new(5),
        }
    }

    // The main UCI processing loop. Reads commands from stdin until
    // "quit" or EOF.
    pub fn main_loop(&mut self) {
        loop {
            let mut raw = String::new();
            if io::stdin().read_line(&mut raw).unwrap_or(0) == 0 {
                break;
            }
            let lower = raw.to_lowercase();
            let tokens: Vec<&str> = lower.split_whitespace().collect();

            if tokens.is_empty() {
                continue;
            }

            match tokens[0] {
                "uci" => self.uci_command(),
                "isready" => self.isready_command(),
                "ucinewgame" => self.ucinewgame_command(),
                "position" => self.position_command(&raw),
                "go" => self.go_command(&tokens),
                "stop" => {} // No internal concurrency to interrupt; accepted and ignored.
                "quit" => break,
                _ => log::warn!("unrecognized UCI command: {}", raw.trim()),
            }
        }
    }

    fn uci_command(&self) {
        println!("id name Corvus");
        println!("id author the corvus-chess contributors");
        println!("uciok");
    }

    fn isready_command(&self) {
        println!("readyok");
    }

    fn ucinewgame_command(&mut self) {
        self.engine.new_game();
    }

    // Process "position [startpos|fen <fen>] [moves <move> ...]".
    // Re-tokenizes the original-case line so the FEN's piece letters
    // (which are case-sensitive) survive.
    fn position_command(&mut self, original_line: &str) {
        let tokens: Vec<&str> = original_line.split_whitespace().collect();
        if tokens.len() < 2 {
            return;
        }

        let moves_index = tokens.iter().position(|&t| t.eq_ignore_ascii_case("moves"));
        let moves_str = moves_index.map(|i| tokens[i + 1..].join(" "));

        let result = if tokens[1].eq_ignore_ascii_case("startpos") {
            match &moves_str {
                Some(m) => self.engine.set_board_from_moves(m),
                None => {
                    self.engine.new_game();
                    Ok(())
                }
            }
        } else if tokens[1].eq_ignore_ascii_case("fen") {
            let fen_end = moves_index.unwrap_or(tokens.len());
            let fen = tokens[2..fen_end].join(" ");
            self.engine.set_board_from_fen(&fen, moves_str.as_deref())
        } else {
            return;
        };

        if let Err(e) = result {
            log::warn!("failed to apply position command: {}", e);
        }
    }

    // Process "go depth N" or "go movetime MS". Any other "go" form uses
    // the default time budget.
    fn go_command(&mut self, tokens: &[&str]) {
        let mut fixed_depth = None;
        let mut movetime = DEFAULT_MOVETIME;

        let mut i = 1;
        while i < tokens.len() {
            match tokens[i] {
                "depth" => {
                    if let Some(d) = tokens.get(i + 1).and_then(|t| t.parse::<u8>().ok()) {
                        fixed_depth = Some(d);
                    }
                    i += 2;
                }
                "movetime" => {
                    if let Some(ms) = tokens.get(i + 1).and_then(|t| t.parse::<u64>().ok()) {
                        movetime = Duration::from_millis(ms);
                    }
                    i += 2;
                }
                _ => i += 1,
            }
        }

        // "go movetime" maps directly onto the time-bounded
        // (endgame_time_limit) budget; the fixed-depth mode's time_limit
        // is vestigial, so the same duration covers both.
        let result = self.engine.select_move(movetime, fixed_depth, movetime);
        self.emit_info(&result);

        match result.best_move {
            Some(mv) => println!("bestmove {}", format_move(&mv)),
            None => println!("bestmove 0000"),
        }
    }

    fn emit_info(&self, result: &crate::controller::SearchResult) {
        let nodes = result.stats.nodes_searched + result.stats.quiescence_nodes;
        let time_ms = result.duration.as_millis().max(1) as u64;
        let nps = nodes * 1000 / time_ms;
        let pv = result.best_move.map(|m| format_move(&m)).unwrap_or_else(|| "(none)".to_string());
        println!(
            "info depth {} score cp {} nodes {} time {} nps {} pv {}",
            result.depth_searched, result.score, nodes, time_ms, nps, pv
        );
    }
}

fn format_move(mv: &movegen::ChessMove) -> String {
    let square_str = |square: usize| -> String {
        let file = "abcdefgh".chars().nth(square % 8).unwrap();
        let rank = square / 8 + 1;
        format!("{}{}", file, rank)
    };
    let promo_char = match mv.promotion {
        Some(p) if p == crate::pieces::QUEEN => "q",
        Some(p) if p == crate::pieces::ROOK => "r",
        Some(p) if p == crate::pieces::BISHOP => "b",
        Some(p) if p == crate::pieces::KNIGHT => "n",
        _ => "",
    };
    format!("{}{}{}", square_str(mv.start_square), square_str(mv.end_square), promo_char)
}
