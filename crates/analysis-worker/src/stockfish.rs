//! Stockfish engine wrapper using UCI protocol (async I/O)

use async_trait::async_trait;
use chess_core::side_to_move;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::EvaluationError;
use crate::evaluation::{Evaluation, Evaluator, Score};

/// Search settings applied at startup and per position
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub depth: u32,
    pub hash_mb: u32,
    pub threads: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            depth: 20,
            hash_mb: 16,
            threads: 1,
        }
    }
}

/// Stockfish engine instance
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    depth: u32,
    /// Set while a `go` is outstanding; a dropped evaluation leaves it set
    searching: bool,
}

impl StockfishEngine {
    /// Spawn a new Stockfish process and initialize UCI
    pub async fn new(path: &str, options: &EngineOptions) -> Result<Self, EvaluationError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EvaluationError::Spawn(format!("{path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EvaluationError::Spawn("stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| EvaluationError::Spawn("stdout not captured".into()))?;

        let mut engine = Self {
            process,
            stdin,
            stdout,
            depth: options.depth,
            searching: false,
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        // Configure for analysis
        engine
            .send(&format!("setoption name Threads value {}", options.threads))
            .await?;
        engine
            .send(&format!("setoption name Hash value {}", options.hash_mb))
            .await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to Stockfish
    async fn send(&mut self, cmd: &str) -> Result<(), EvaluationError> {
        debug!(cmd, "SF <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EvaluationError::Io(format!("Failed to write to Stockfish: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EvaluationError::Io(format!("Failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Wait for a specific response line
    async fn wait_for(&mut self, expected: &str) -> Result<(), EvaluationError> {
        read_until_line(&mut self.stdout, expected).await
    }

    /// Finish a search abandoned by a cancelled evaluation.
    ///
    /// The cancelled read may have consumed part of a line, so nothing before
    /// `readyok` is trusted. UCI answers `isready` only after the `bestmove`
    /// that `stop` triggers.
    async fn resync(&mut self) -> Result<(), EvaluationError> {
        warn!("Previous search was abandoned, stopping engine");
        self.send("stop").await?;
        self.send("isready").await?;
        self.wait_for("readyok").await?;
        self.searching = false;
        Ok(())
    }

    /// Search a position and return the last reported score, from the side to move
    async fn search(&mut self, fen: &str) -> Result<Option<Score>, EvaluationError> {
        if self.searching {
            self.resync().await?;
        }

        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {}", self.depth)).await?;
        self.searching = true;

        let mut score = None;
        let mut line = String::new();
        loop {
            read_line(&mut self.stdout, &mut line).await?;
            let trimmed = line.trim();

            if trimmed.starts_with("info") && trimmed.contains(" score ") {
                // Mated/stalemated positions report "score mate 0" / "score cp 0" without a pv
                if let Some(cp) = parse_cp(trimmed) {
                    score = Some(Score::Centipawns(cp));
                }
                if let Some(mate) = parse_mate(trimmed) {
                    score = Some(Score::Mate(mate));
                }
            } else if trimmed.starts_with("bestmove") {
                self.searching = false;
                break;
            }
        }

        Ok(score)
    }

    /// Send quit command and wait for process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

#[async_trait]
impl Evaluator for StockfishEngine {
    async fn evaluate(&mut self, fen: &str) -> Result<Evaluation, EvaluationError> {
        let perspective =
            side_to_move(fen).ok_or_else(|| EvaluationError::InvalidPosition(fen.to_string()))?;
        let score = self
            .search(fen)
            .await?
            .ok_or_else(|| EvaluationError::NoScore(fen.to_string()))?;
        Ok(Evaluation::new(score, perspective))
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Read one line; EOF means the process is gone
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut String,
) -> Result<(), EvaluationError> {
    line.clear();
    let n = reader
        .read_line(line)
        .await
        .map_err(|e| EvaluationError::Io(format!("Failed to read from Stockfish: {e}")))?;
    if n == 0 {
        return Err(EvaluationError::ProcessExited);
    }
    Ok(())
}

/// Skip output until a line reading exactly `expected`
async fn read_until_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    expected: &str,
) -> Result<(), EvaluationError> {
    let mut line = String::new();
    loop {
        read_line(reader, &mut line).await?;
        let trimmed = line.trim();
        debug!(line = trimmed, "SF >");
        if trimmed == expected {
            return Ok(());
        }
    }
}

/// Parse centipawn score from info line
fn parse_cp(line: &str) -> Option<i32> {
    parse_after(line, "cp")
}

/// Parse mate score from info line
fn parse_mate(line: &str) -> Option<i32> {
    parse_after(line, "mate")
}

fn parse_after(line: &str, keyword: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == keyword && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}
