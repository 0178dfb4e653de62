use std::sync::{Arc, Weak};

use chrono::Utc;

use crate::app::{AppContext, Result, SkylightError};
use crate::client::{MAX_FETCH_COUNT, MIN_FETCH_COUNT};
use crate::config::settings::SettingsObserver;
use crate::domain::Post;
use crate::scheduler::{AutoRefreshScheduler, PresentationSink};
use crate::timeline::MergeResult;

pub async fn fetch_once(ctx: &AppContext, count: Option<usize>) -> Result<()> {
    if !ctx.is_authenticated() {
        return Err(SkylightError::NotAuthenticated);
    }

    let count = count
        .unwrap_or(ctx.settings.current().fetch_count)
        .clamp(MIN_FETCH_COUNT, MAX_FETCH_COUNT);

    let entries = ctx.client.fetch_timeline(count).await?;
    let batch = ctx.normalizer.normalize_batch(&entries, Utc::now());
    let result = ctx.engine.merge(batch, None)?;

    for post in ctx.engine.timeline()? {
        print_post(&post);
    }
    println!("{}", result.status_line());

    Ok(())
}

pub async fn watch(ctx: Arc<AppContext>, interval: Option<u64>) -> Result<()> {
    if !ctx.is_authenticated() {
        return Err(SkylightError::NotAuthenticated);
    }

    if let Some(interval) = interval {
        let mut settings = ctx.settings.current();
        settings.fetch_interval = interval;
        settings.auto_fetch = true;
        ctx.settings
            .update(settings, Some("timeline.fetch_interval"));
    }

    let scheduler = Arc::new(AutoRefreshScheduler::new(
        ctx.client.clone(),
        ctx.engine.clone(),
        ctx.normalizer.clone(),
        ctx.settings.clone(),
        Arc::new(StdoutSink),
    ));
    let _subscription = ctx
        .settings
        .subscribe(Arc::downgrade(&scheduler) as Weak<dyn SettingsObserver>);

    scheduler.start();
    // Show something before the first timer tick fires.
    scheduler.refresh_now().await;
    for post in ctx.engine.timeline()? {
        print_post(&post);
    }
    println!(
        "Watching timeline (every {}s, Ctrl+C to stop)",
        scheduler.fetch_interval()
    );

    tokio::signal::ctrl_c().await?;
    scheduler.shutdown();
    println!("Stopped");

    Ok(())
}

fn print_post(post: &Post) {
    println!(
        "[{}] {} (@{}): {}",
        post.display_time, post.author_display_name, post.author_handle, post.text
    );
}

/// Prints merge outcomes as they happen; the watch command's sink.
struct StdoutSink;

impl PresentationSink for StdoutSink {
    fn merge_applied(&self, result: &MergeResult) {
        for post in &result.added {
            print_post(post);
        }
        for post in &result.edited {
            println!("(edited) {} (@{})", post.author_display_name, post.author_handle);
        }
        if !result.added.is_empty() || !result.edited.is_empty() {
            println!("{}", result.status_line());
        }
    }

    fn labels_changed(&self, _changes: &[(String, String)]) {}
}
