//! Fetch one or more URLs concurrently on a single reactor.
//!
//! ```text
//! cargo run -p pollfetch --example fetch -- http://example.com/ http://example.org
//! RUST_LOG=pollfetch=trace cargo run -p pollfetch --example fetch
//! ```

use pollfetch::{Config, Reactor};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pollfetch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        urls.push("http://example.com/".to_string());
    }

    let mut reactor = Reactor::new(Config::default())?;
    let completions = reactor.completions();

    for url in &urls {
        if let Err(e) = reactor.start_fetch(url) {
            eprintln!("{url}: {e}");
        }
    }
    reactor.run_until_idle()?;

    for done in completions.try_iter() {
        match done.result {
            Ok(response) => {
                eprintln!(
                    "{} ({}): status {:?}, {} body bytes",
                    done.url,
                    done.id,
                    response.status(),
                    response.body().len()
                );
                println!("{}", response.body());
            }
            Err(e) => eprintln!("{} ({}): {e}", done.url, done.id),
        }
    }
    Ok(())
}
