use crate::output::print_json_line;
use rule_core::config::ClientConfig;
use rule_core::session::{Session, SessionEvent};

pub async fn run(config: rule_core::Result<ClientConfig>, json: bool) -> anyhow::Result<()> {
    let signed = super::connect(config).await?;
    let mut session = Session::start(signed);
    if !json {
        println!("Watching {} (Ctrl-C to stop)", session.identity());
    }

    loop {
        let event = tokio::select! {
            event = session.next_event() => event,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(event) = event else {
            break;
        };
        // The first log snapshot ends the loading state; nothing to show
        // before it.
        if session.is_loading() {
            continue;
        }
        let progress = session.progress();
        if json {
            let kind = match event {
                SessionEvent::Schema => "schema",
                SessionEvent::Logs => "logs",
            };
            print_json_line(&serde_json::json!({ "event": kind, "progress": progress }))?;
        } else {
            println!(
                "[{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                super::dashboard::pulse_line(&progress)
            );
        }
    }

    session.shutdown();
    Ok(())
}
