use chrono::DateTime;

const USAGE: &str = "Usage: devlog [--version] | devlog optimize | devlog watchdog <last-run-epoch> [--force]";

#[tokio::main]
async fn main() {
  let mut args = std::env::args().skip(1);
  let result = match args.next().as_deref() {
    Some("--version") | Some("-V") => {
      println!("devlog {}", env!("CARGO_PKG_VERSION"));
      return;
    }
    Some("--help") | Some("-h") => {
      eprintln!("{USAGE}");
      return;
    }
    Some("optimize") => devlog::app::run_optimize().await.map(|_| ()),
    Some("watchdog") => {
      let Some(last_run) = args
        .next()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
      else {
        eprintln!("{USAGE}");
        std::process::exit(2);
      };
      let force = args.any(|a| a == "--force");
      devlog::app::run_watchdog(last_run, force).await.map(|_| ())
    }
    Some(other) => {
      eprintln!("unknown argument: {other}\n{USAGE}");
      std::process::exit(2);
    }
    None => devlog::app::run().await,
  };

  if let Err(e) = result {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}
