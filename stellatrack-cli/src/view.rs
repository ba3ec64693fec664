//! Terminal rendering of runs, catalog pools and stats.
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

use stellatrack_core::{
    CapacitySnapshot, Catalog, Potential, Rarity, Role, Run, RunStats, Target, TrackerConfig,
    compute_capacity,
};

/// A titled slice of a character's potential pool.
pub struct PoolGroup<'a> {
    pub title: Option<String>,
    pub potentials: Vec<&'a Potential>,
}

/// Split a pool into build groups of six: two role builds, general, then the rest.
#[must_use]
pub fn pool_groups<'a>(pool: &[&'a Potential], role: Role) -> Vec<PoolGroup<'a>> {
    let role_title = match role {
        Role::Main => "Main",
        Role::Support => "Support",
    };
    let titles = [
        Some(format!("{role_title} Build 1")),
        Some(format!("{role_title} Build 2")),
        Some("General".to_string()),
        None,
    ];
    let bounds = [(0, 6), (6, 12), (12, 18), (18, usize::MAX)];
    titles
        .into_iter()
        .zip(bounds)
        .filter_map(|(title, (start, end))| {
            let end = end.min(pool.len());
            (start < end).then(|| PoolGroup {
                title,
                potentials: pool[start..end].to_vec(),
            })
        })
        .collect()
}

/// Case-insensitive match on name or description template.
#[must_use]
pub fn matches_query(potential: &Potential, query: &str) -> bool {
    let query = query.to_lowercase();
    potential.name.to_lowercase().contains(&query)
        || potential
            .description_template
            .to_lowercase()
            .contains(&query)
}

fn rarity_label(rarity: Rarity) -> ColoredString {
    let label = rarity.to_string();
    match rarity {
        Rarity::Common => label.dimmed(),
        Rarity::Rare => label.magenta(),
        Rarity::Super => label.bright_red().bold(),
    }
}

fn role_badge(role: Role) -> ColoredString {
    let label = format!("[{}]", role.as_str().to_uppercase());
    match role {
        Role::Main => label.yellow().bold(),
        Role::Support => label.cyan().bold(),
    }
}

fn character_name<'a>(catalog: &'a Catalog, char_id: &'a str) -> &'a str {
    catalog
        .character(char_id)
        .map_or(char_id, |c| c.name.as_str())
}

pub fn render_capacity(out: &mut impl Write, snapshot: &CapacitySnapshot) -> io::Result<()> {
    let slots = format!("Slots: {} / {}", snapshot.used_slots, snapshot.capacity);
    let slots = if snapshot.is_full {
        slots.red().bold()
    } else {
        slots.yellow()
    };
    writeln!(
        out,
        "   {slots}   {}",
        format!("Cost: {}", snapshot.total_level_cost).cyan()
    )
}

fn render_target(
    out: &mut impl Write,
    catalog: &Catalog,
    cfg: &TrackerConfig,
    target: &Target,
) -> io::Result<()> {
    let maxed = if target.is_maxed(cfg.max_level) {
        " MAX".bright_yellow().bold().to_string()
    } else {
        String::new()
    };
    match catalog.potential(&target.potential_id) {
        Some(potential) => {
            writeln!(
                out,
                "   • {} {} Lv {}{maxed}",
                potential.id.dimmed(),
                potential.name.bold(),
                target.level
            )?;
            writeln!(out, "       {}", potential.describe(target.level))
        }
        None => writeln!(
            out,
            "   • {} Lv {}{maxed}",
            target.potential_id.dimmed(),
            target.level
        ),
    }
}

pub fn render_run_summary(out: &mut impl Write, catalog: &Catalog, run: &Run) -> io::Result<()> {
    writeln!(
        out,
        "{}  {}  {} + {} / {}  ({} targets)",
        run.id.dimmed(),
        run.name.bold(),
        character_name(catalog, &run.main_char_id).yellow(),
        character_name(catalog, &run.support_char_id_1).cyan(),
        character_name(catalog, &run.support_char_id_2).cyan(),
        run.targets.len()
    )
}

pub fn render_run(
    out: &mut impl Write,
    catalog: &Catalog,
    cfg: &TrackerConfig,
    run: &Run,
) -> io::Result<()> {
    writeln!(out, "{} {}", "📋".bold(), run.name.bright_cyan().bold())?;
    writeln!(out, "{}", "=".repeat(32).cyan())?;
    for (char_id, role) in run.slots() {
        writeln!(out)?;
        writeln!(out, "{} {}", character_name(catalog, char_id).bold(), role_badge(role))?;
        render_capacity(out, &compute_capacity(run, char_id, role, cfg))?;
        let mut any = false;
        for target in run.targets_for(char_id) {
            let owned_by_slot = catalog
                .potential(&target.potential_id)
                .is_none_or(|p| p.role == role);
            if owned_by_slot {
                any = true;
                render_target(out, catalog, cfg, target)?;
            }
        }
        if !any {
            writeln!(out, "   {}", "No targets yet".italic().dimmed())?;
        }
    }
    Ok(())
}

pub fn render_pool(
    out: &mut impl Write,
    pool: &[&Potential],
    role: Role,
    run: Option<&Run>,
    query: Option<&str>,
) -> io::Result<()> {
    for group in pool_groups(pool, role) {
        let visible: Vec<&Potential> = group
            .potentials
            .into_iter()
            .filter(|p| query.is_none_or(|q| matches_query(p, q)))
            .collect();
        if visible.is_empty() {
            continue;
        }
        if let Some(title) = group.title {
            writeln!(out, "{}", title.bold().underline())?;
        }
        for potential in visible {
            let selected = run.is_some_and(|r| r.find_target(&potential.id).is_some());
            let marker = if selected { "✔".green() } else { " ".normal() };
            writeln!(
                out,
                " {marker} #{:<2} {:<16} {:<24} {}",
                potential.display_number,
                potential.id,
                potential.name,
                rarity_label(potential.rarity)
            )?;
        }
    }
    Ok(())
}

pub fn render_stats(out: &mut impl Write, run: &Run, stats: &RunStats) -> io::Result<()> {
    writeln!(out, "{} {}", "📊".bold(), run.name.bright_cyan().bold())?;
    if stats.is_empty() {
        return writeln!(out, "{}", "No stats active yet.".dimmed());
    }
    for (stat, value) in stats {
        writeln!(out, "  {stat:<16} {}", format!("+{value}%").green().bold())?;
    }
    Ok(())
}
