use std::{fmt::Write as _, time::Instant};

use {ditzy_common::types::OutboundContent, ditzy_config::BotConfig, tracing::info};

use crate::{
    error::Result,
    format::{format_runtime, format_size},
    handler::InboundHandler,
    normalize::NormalizedMessage,
    system::SystemReport,
};

/// The first configured owner and the JID to mention for them.
pub(super) fn owner_mention(bot: &BotConfig) -> Option<(&str, String)> {
    bot.owner
        .first()
        .map(|owner| (owner.as_str(), format!("{owner}@s.whatsapp.net")))
}

pub(super) async fn ping(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let start = Instant::now();
    handler
        .reply(msg, OutboundContent::text("Calculating ping..."))
        .await?;
    let elapsed = start.elapsed().as_millis();
    handler
        .reply(msg, OutboundContent::text(format!("Pong!\nSpeed: {elapsed}ms")))
        .await
}

pub(super) async fn menu(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let bot = &handler.config().bot;
    let p = &bot.prefix;
    let name = if msg.display_name.is_empty() {
        "User"
    } else {
        &msg.display_name
    };

    let (owner_line, mentions) = match owner_mention(bot) {
        Some((owner, jid)) => (format!("Owner: @{owner}\n"), vec![jid]),
        None => (String::new(), Vec::new()),
    };

    let text = format!(
        "*{bot_name}*\n\n\
         Welcome {name}!\n\n\
         Runtime: {runtime}\n\
         {owner_line}\
         Prefix: {p}\n\n\
         BASIC COMMANDS\n\
         {p}ping - Check bot speed\n\
         {p}menu - Show this menu\n\
         {p}info - Bot and server information\n\
         {p}runtime - Bot uptime\n\
         {p}restart - Restart the bot (owner only)\n\n\
         MEDIA COMMANDS\n\
         {p}sticker [pack] [author] - Create sticker from image\n\
         {p}toimg - Convert sticker to image\n\
         {p}music - Play the bot's music\n\
         {p}welcome - Welcome image\n\
         {p}rvo - Reveal view once\n\
         {p}mediainfo - Describe replied media\n\
         {p}getimg <url> - Fetch an image from a URL",
        bot_name = bot.name,
        runtime = format_runtime(handler.uptime().as_secs()),
    );

    handler
        .reply(msg, OutboundContent::Text { text, mentions })
        .await
}

/// Render the `.info` report.
pub(super) fn render_info(bot: &BotConfig, report: &SystemReport) -> String {
    let mut text = String::from("BOT INFORMATION\n");
    let _ = writeln!(text, "Name: {}", bot.name);
    let _ = writeln!(text, "Version: {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(text, "Platform: {}", std::env::consts::OS);
    let _ = writeln!(text, "Architecture: {}", std::env::consts::ARCH);
    if let Some((owner, _)) = owner_mention(bot) {
        let _ = writeln!(text, "Owner: @{owner}");
    }

    text.push_str("\nMEMORY USAGE\n");
    let _ = writeln!(text, "Resident: {}", format_size(report.resident));
    let _ = writeln!(text, "Virtual: {}", format_size(report.virtual_memory));

    text.push_str("\nSERVER INFO\n");
    let cpu = if report.cpu_model.is_empty() {
        "Unknown"
    } else {
        &report.cpu_model
    };
    let _ = writeln!(text, "CPU: {cpu}");
    let _ = writeln!(text, "Cores: {}", report.cores);
    let _ = writeln!(text, "Free RAM: {}", format_size(report.free_memory));
    let _ = writeln!(text, "Total RAM: {}", format_size(report.total_memory));
    let [one, five, fifteen] = report.load_average;
    let _ = writeln!(text, "Load Average: {one:.2}, {five:.2}, {fifteen:.2}");

    text.push_str("\nBot is running smoothly!");
    text
}

pub(super) async fn info(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let bot = &handler.config().bot;
    let text = render_info(bot, &SystemReport::collect());
    let mentions = owner_mention(bot).map(|(_, jid)| jid).into_iter().collect();
    handler
        .reply(msg, OutboundContent::Text { text, mentions })
        .await
}

pub(super) async fn runtime(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    let text = format!("Bot Runtime\n{}", format_runtime(handler.uptime().as_secs()));
    handler.reply(msg, OutboundContent::text(text)).await
}

/// Owner-only. Signals the supervisor through the handler's shutdown token.
pub(super) async fn restart(handler: &InboundHandler, msg: &NormalizedMessage) -> Result<()> {
    if !handler.is_owner(msg) {
        return handler
            .reply(msg, OutboundContent::text("This command is only for owners!"))
            .await;
    }

    handler
        .reply(msg, OutboundContent::text("Restarting bot..."))
        .await?;
    info!(sender_id = %msg.sender_id, "restart requested");
    handler.shutdown_token().cancel();
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_report_layout() {
        let bot = BotConfig {
            owner: vec!["628111".into()],
            ..BotConfig::default()
        };
        let report = SystemReport {
            resident: 48 * 1024 * 1024,
            virtual_memory: 1536 * 1024 * 1024,
            cpu_model: "Test CPU".into(),
            cores: 8,
            free_memory: 4 * 1024 * 1024 * 1024,
            total_memory: 16 * 1024 * 1024 * 1024,
            load_average: [0.5, 0.25, 1.0],
        };

        let text = render_info(&bot, &report);
        assert!(text.starts_with("BOT INFORMATION\nName: Ditzy Time\n"));
        assert!(text.contains("Owner: @628111\n"));
        assert!(text.contains("\nMEMORY USAGE\nResident: 48 MB\nVirtual: 1.5 GB\n"));
        assert!(text.contains(
            "\nSERVER INFO\nCPU: Test CPU\nCores: 8\nFree RAM: 4 GB\nTotal RAM: 16 GB\n\
             Load Average: 0.50, 0.25, 1.00\n"
        ));
        assert!(text.ends_with("Bot is running smoothly!"));
    }

    #[test]
    fn info_without_owner_or_cpu_model() {
        let text = render_info(&BotConfig::default(), &SystemReport::default());
        assert!(!text.contains("Owner:"));
        assert!(text.contains("CPU: Unknown\n"));
        assert!(text.contains("Resident: 0 Bytes\n"));
    }
}
