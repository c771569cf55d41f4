use anyhow::Context;
use vest_config::VestConfig;
use vest_core::enums::Role;
use vest_core::money::parse_rate_percent;
use vest_core::period::Period;
use vest_core::responses::DistributionReport;
use vest_db::helpers::PageRequest;
use vest_db::repos::user::UserFilter;
use vest_db::service::VestService;
use vest_mail::{Mailer, Message};

use crate::cli::{GlobalFlags, ReturnsCommands};
use crate::output;

pub async fn handle(action: ReturnsCommands, config: &VestConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        ReturnsCommands::Distribute { index, rate, period } => {
            let rate_bps = parse_rate_percent(&rate)?;
            let period = period
                .as_deref()
                .map(str::parse::<Period>)
                .transpose()
                .context("--period must look like 2026-W07")?;

            // Built up front: once returns are credited nothing may fail the run.
            let mailer = Mailer::from_config(&config.mail, &config.general)?;
            let service = super::open_service(config).await?;
            let actor = operator_id(&service).await?;
            let index = service.find_index(&index).await?;
            let report = service
                .distribute_returns(&actor, &index.id, rate_bps, period)
                .await
                .with_context(|| format!("distribution for {} failed", index.name))?;

            notify_investors(&service, &mailer, &report).await;
            output::print(&report, flags.format)
        }
    }
}

/// Mail every credited investor, returning how many were reached.
async fn notify_investors(service: &VestService, mailer: &Mailer, report: &DistributionReport) -> usize {
    let mut notified = 0;
    for credit in &report.credits {
        let user = match service.get_user(&credit.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(user_id = %credit.user_id, error = %e, "skipping returns mail");
                continue;
            }
        };
        mailer
            .send_logged(
                &user.email,
                &Message::ReturnsCredited {
                    name: &user.name,
                    index: &report.index_name,
                    amount_cents: credit.amount_cents,
                    period: report.distribution.period,
                },
            )
            .await;
        notified += 1;
    }
    notified
}

/// Distributions started from the CLI are attributed to an administrator account.
async fn operator_id(service: &VestService) -> anyhow::Result<String> {
    let admins = service
        .list_users(
            &UserFilter {
                role: Some(Role::Admin),
                ..UserFilter::default()
            },
            PageRequest::clamped(Some(1), Some(1), 1, 1),
        )
        .await?;
    admins
        .items
        .into_iter()
        .next()
        .map(|admin| admin.id)
        .context("no administrator account exists; run `vest user create --admin` first")
}
