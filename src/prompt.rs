use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tome_resolve::{Candidate, Choice, Disambiguator, parse_choice};

/// Asks on the terminal. End of input cancels.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl Disambiguator for TerminalPrompt {
    async fn choose(&self, query: &str, candidates: &[Candidate]) -> Choice {
        println!("No confident match for '{query}'. Did you mean:");
        for (position, candidate) in candidates.iter().enumerate() {
            println!("  {}. {} ({:.0}%)", position + 1, candidate.name(), candidate.score);
        }
        println!("  0. Cancel");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("Choice [0-{}]: ", candidates.len());
            let _ = std::io::stdout().flush();
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(choice) = parse_choice(&line, candidates.len()) {
                        return choice;
                    }
                    println!("Enter a number between 0 and {}.", candidates.len());
                },
                Ok(None) | Err(_) => return Choice::Cancel,
            }
        }
    }
}
