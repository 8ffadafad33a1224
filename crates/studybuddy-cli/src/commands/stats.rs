use chrono::NaiveDate;
use clap::Subcommand;
use serde::Serialize;
use studybuddy_core::{Clock, Database, SystemClock, TimerStore};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's sessions and the current streak
    Today,
    /// All-time stats
    All,
    /// Every completed session, oldest first
    Sessions,
}

#[derive(Serialize)]
struct TodayReport {
    date: NaiveDate,
    sessions: u64,
    seconds: u64,
    streak: u32,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = TimerStore::new(Database::open()?).load_ledger();
    let today = SystemClock.today();

    match action {
        StatsAction::Today => {
            let stats = ledger.stats(today);
            let report = TodayReport {
                date: today,
                sessions: stats.today_sessions,
                seconds: stats.today_seconds,
                streak: stats.streak,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::All => {
            let stats = ledger.stats(today);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Sessions => {
            println!("{}", serde_json::to_string_pretty(ledger.sessions())?);
        }
    }
    Ok(())
}
