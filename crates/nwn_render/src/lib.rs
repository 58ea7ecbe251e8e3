use std::fmt::Write as _;

use nwn_core::core_api::Session;
use nwn_core::creature::ClassId;
use nwn_core::feats::{
    CategoryFilter, FeatCatalogEntry, FeatFilter, FeatGroup, FeatSummary, GrantSource, GroupKind,
    Status,
};
use serde_json::{Map as JsonMap, Value as JsonValue};

const FEAT_COL_WIDTH_ID: usize = 6;
const FEAT_COL_WIDTH_NAME: usize = 36;
const FEAT_COL_WIDTH_CATEGORY: usize = 15;
const FEAT_COL_WIDTH_STATUS: usize = 21;
const SHEET_WIDTH: usize = 76;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Replace the flat feat list with race/class/manual sections.
    pub grouped: bool,
    /// Skip the feat list and print only the header and counts.
    pub summary_only: bool,
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(default_json(session)),
    }
}

pub fn render_json_summary(session: &Session, style: JsonStyle) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => {
            let mut out = creature_json(session);
            out.insert(
                "summary".to_string(),
                summary_to_json(session.summary(), session.catalog().len()),
            );
            JsonValue::Object(out)
        }
    }
}

pub fn render_text_sheet(session: &Session) -> String {
    render_text_sheet_with_options(session, TextRenderOptions::default())
}

pub fn render_text_sheet_with_options(session: &Session, options: TextRenderOptions) -> String {
    let mut out = String::new();
    write_header(&mut out, session);
    writeln!(&mut out).expect("writing to String cannot fail");

    writeln!(&mut out, " ::: Summary :::").expect("writing to String cannot fail");
    for line in render_summary_lines(session.summary()) {
        writeln!(&mut out, "  {line}").expect("writing to String cannot fail");
    }
    let orphans: Vec<String> = session
        .catalog()
        .orphans()
        .map(|feat| feat.to_string())
        .collect();
    if !orphans.is_empty() {
        writeln!(
            &mut out,
            "  Unknown feats on creature: {}",
            orphans.join(", ")
        )
        .expect("writing to String cannot fail");
    }

    if options.summary_only {
        return out;
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    if options.grouped {
        write_grouped_sections(&mut out, session);
    } else {
        writeln!(&mut out, " ::: Feats :::").expect("writing to String cannot fail");
        write_feat_table(&mut out, session, session.displayed());
    }
    out
}

/// Human readable counts in display order. Always at least three lines.
pub fn render_summary_lines(summary: &FeatSummary) -> Vec<String> {
    let chosen = summary.selected;
    let expected = summary.expected;
    let mut lines = vec![
        format!(
            "Feats on creature: {} ({} granted, {} chosen)",
            summary.assigned, summary.granted, chosen
        ),
        format!(
            "Expected choices: {} (general {}, racial {}, class {}), {}",
            expected.total_expected,
            expected.general,
            expected.racial,
            expected.class_bonus,
            summary.balance
        ),
        format!("Unavailable feats: {}", summary.unavailable),
    ];
    if let Some(shown) = summary.shown {
        lines.push(shown.to_string());
    }
    if summary.no_results {
        lines.push("No feats match the current filter.".to_string());
    }
    lines
}

fn default_json(session: &Session) -> JsonMap<String, JsonValue> {
    let catalog = session.catalog();
    let mut out = creature_json(session);

    out.insert(
        "summary".to_string(),
        summary_to_json(session.summary(), catalog.len()),
    );
    out.insert("filter".to_string(), filter_to_json(session.filter()));
    out.insert(
        "feats".to_string(),
        JsonValue::Array(
            session
                .displayed()
                .map(|entry| entry_to_json(session, entry))
                .collect(),
        ),
    );
    out.insert(
        "groups".to_string(),
        JsonValue::Array(
            session
                .grouped()
                .iter()
                .map(|group| group_to_json(session, group))
                .collect(),
        ),
    );
    out.insert(
        "orphan_feats".to_string(),
        JsonValue::Array(
            catalog
                .orphans()
                .map(|feat| JsonValue::from(feat.0))
                .collect(),
        ),
    );

    out
}

fn creature_json(session: &Session) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    out.insert("name".to_string(), JsonValue::String(snapshot.name.clone()));
    out.insert("race".to_string(), JsonValue::from(snapshot.race.0));
    out.insert(
        "race_name".to_string(),
        optional_string(snapshot.race_name.as_deref()),
    );
    out.insert(
        "classes".to_string(),
        JsonValue::Array(
            snapshot
                .classes
                .iter()
                .map(|entry| {
                    let mut m = JsonMap::new();
                    m.insert("class".to_string(), JsonValue::from(entry.class.0));
                    m.insert("name".to_string(), optional_string(entry.name.as_deref()));
                    m.insert("level".to_string(), JsonValue::from(entry.level));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    );
    out.insert("level".to_string(), JsonValue::from(snapshot.total_level));
    out.insert(
        "base_attack".to_string(),
        JsonValue::from(snapshot.base_attack),
    );

    out
}

fn summary_to_json(summary: &FeatSummary, total: usize) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("assigned".to_string(), JsonValue::from(summary.assigned));
    m.insert("granted".to_string(), JsonValue::from(summary.granted));
    m.insert("selected".to_string(), JsonValue::from(summary.selected));

    let mut expected = JsonMap::new();
    expected.insert(
        "general".to_string(),
        JsonValue::from(summary.expected.general),
    );
    expected.insert(
        "racial".to_string(),
        JsonValue::from(summary.expected.racial),
    );
    expected.insert(
        "class_bonus".to_string(),
        JsonValue::from(summary.expected.class_bonus),
    );
    expected.insert(
        "total".to_string(),
        JsonValue::from(summary.expected.total_expected),
    );
    m.insert("expected".to_string(), JsonValue::Object(expected));

    m.insert(
        "balance".to_string(),
        JsonValue::from(summary.balance.delta()),
    );
    m.insert(
        "balance_text".to_string(),
        JsonValue::String(summary.balance.to_string()),
    );
    m.insert(
        "unavailable".to_string(),
        JsonValue::from(summary.unavailable),
    );
    m.insert(
        "shown".to_string(),
        JsonValue::from(summary.shown.map_or(total, |shown| shown.shown)),
    );
    m.insert("total".to_string(), JsonValue::from(total));
    m.insert("no_results".to_string(), JsonValue::Bool(summary.no_results));
    JsonValue::Object(m)
}

fn filter_to_json(filter: &FeatFilter) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("search".to_string(), JsonValue::String(filter.search.clone()));
    m.insert(
        "category".to_string(),
        JsonValue::String(match filter.category {
            CategoryFilter::All => "all".to_string(),
            CategoryFilter::Only(category) => category.key().to_string(),
        }),
    );
    m.insert(
        "statuses".to_string(),
        JsonValue::Array(
            Status::ALL
                .into_iter()
                .filter(|status| filter.statuses.allows(*status))
                .map(|status| JsonValue::String(status.key().to_string()))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn entry_to_json(session: &Session, entry: &FeatCatalogEntry) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::from(entry.id().0));
    m.insert("name".to_string(), JsonValue::String(entry.name().to_string()));
    m.insert(
        "category".to_string(),
        JsonValue::String(entry.feat.category.key().to_string()),
    );
    m.insert(
        "status".to_string(),
        JsonValue::String(entry.status.key().to_string()),
    );
    m.insert(
        "granted_by".to_string(),
        match entry.granted_by {
            None => JsonValue::Null,
            Some(source) => {
                let mut g = JsonMap::new();
                match source {
                    GrantSource::Race => {
                        let race = session.creature().race;
                        g.insert("kind".to_string(), JsonValue::String("race".to_string()));
                        g.insert("id".to_string(), JsonValue::from(race.0));
                    }
                    GrantSource::Class(class) => {
                        g.insert("kind".to_string(), JsonValue::String("class".to_string()));
                        g.insert("id".to_string(), JsonValue::from(class.0));
                    }
                }
                g.insert(
                    "name".to_string(),
                    JsonValue::String(source_label(session, source)),
                );
                JsonValue::Object(g)
            }
        },
    );
    JsonValue::Object(m)
}

fn group_to_json(session: &Session, group: &FeatGroup<'_>) -> JsonValue {
    let mut m = JsonMap::new();
    let kind = match group.kind {
        GroupKind::Race => "race",
        GroupKind::Class(_) => "class",
        GroupKind::Manual => "manual",
    };
    m.insert("kind".to_string(), JsonValue::String(kind.to_string()));
    if let GroupKind::Class(class) = group.kind {
        m.insert("class".to_string(), JsonValue::from(class.0));
    }
    m.insert(
        "label".to_string(),
        JsonValue::String(group_label(session, group.kind)),
    );
    m.insert(
        "feats".to_string(),
        JsonValue::Array(
            group
                .entries
                .iter()
                .map(|entry| JsonValue::from(entry.id().0))
                .collect(),
        ),
    );
    JsonValue::Object(m)
}

fn write_header(out: &mut String, session: &Session) {
    let snapshot = session.snapshot();
    let race = snapshot
        .race_name
        .clone()
        .unwrap_or_else(|| format!("race {}", snapshot.race));
    let classes: Vec<String> = snapshot
        .classes
        .iter()
        .map(|entry| match &entry.name {
            Some(name) => format!("{name} {}", entry.level),
            None => format!("class {} {}", entry.class, entry.level),
        })
        .collect();

    writeln!(out).expect("writing to String cannot fail");
    writeln!(out, "{}", centered_no_trailing("CREATURE FEATS", SHEET_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(out).expect("writing to String cannot fail");

    let name_section = format!("  Name: {:<30}", snapshot.name);
    writeln!(out, "{}Race: {}", name_section, race).expect("writing to String cannot fail");
    let level_section = format!(" Level: {:02}", snapshot.total_level);
    writeln!(
        out,
        "{:<38}Base Attack: +{}",
        level_section, snapshot.base_attack
    )
    .expect("writing to String cannot fail");
    let class_list = if classes.is_empty() {
        "none".to_string()
    } else {
        classes.join(" / ")
    };
    writeln!(out, "  Classes: {class_list}").expect("writing to String cannot fail");
}

fn write_grouped_sections(out: &mut String, session: &Session) {
    let groups = session.grouped();
    if groups.is_empty() {
        writeln!(out, " ::: Feats :::").expect("writing to String cannot fail");
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            writeln!(out).expect("writing to String cannot fail");
        }
        writeln!(out, " ::: {} :::", group_label(session, group.kind))
            .expect("writing to String cannot fail");
        write_feat_table(out, session, group.entries.iter().copied());
    }
}

fn write_feat_table<'a, I>(out: &mut String, session: &Session, entries: I)
where
    I: IntoIterator<Item = &'a FeatCatalogEntry>,
{
    let rows: Vec<String> = entries
        .into_iter()
        .map(|entry| feat_row(session, entry))
        .collect();
    if rows.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }

    let heading = format!(
        " {:>i$}  {:<n$}{:<c$}{:<s$}Source",
        "ID",
        "Name",
        "Category",
        "Status",
        i = FEAT_COL_WIDTH_ID - 1,
        n = FEAT_COL_WIDTH_NAME,
        c = FEAT_COL_WIDTH_CATEGORY,
        s = FEAT_COL_WIDTH_STATUS
    );
    writeln!(out, "{heading}").expect("writing to String cannot fail");
    for row in rows {
        writeln!(out, "{row}").expect("writing to String cannot fail");
    }
}

fn feat_row(session: &Session, entry: &FeatCatalogEntry) -> String {
    let source = match entry.granted_by {
        Some(source) => source_label(session, source),
        None if entry.status == Status::Granted => "granted".to_string(),
        None => String::new(),
    };
    let line = format!(
        " {:>i$}  {:<n$}{:<c$}{:<s$}{}",
        entry.id().0,
        fit_column(entry.name(), FEAT_COL_WIDTH_NAME - 1),
        entry.feat.category.as_str(),
        entry.status.as_str(),
        source,
        i = FEAT_COL_WIDTH_ID - 1,
        n = FEAT_COL_WIDTH_NAME,
        c = FEAT_COL_WIDTH_CATEGORY,
        s = FEAT_COL_WIDTH_STATUS
    );
    line.trim_end().to_string()
}

fn source_label(session: &Session, source: GrantSource) -> String {
    match source {
        GrantSource::Race => {
            let race = session.creature().race;
            session
                .rules()
                .race_name(race)
                .map(str::to_string)
                .unwrap_or_else(|| format!("race {race}"))
        }
        GrantSource::Class(class) => class_label(session, class),
    }
}

fn class_label(session: &Session, class: ClassId) -> String {
    session
        .rules()
        .class_name(class)
        .map(str::to_string)
        .unwrap_or_else(|| format!("class {class}"))
}

fn group_label(session: &Session, kind: GroupKind) -> String {
    match kind {
        GroupKind::Race => format!("Race: {}", source_label(session, GrantSource::Race)),
        GroupKind::Class(class) => format!("Class: {}", class_label(session, class)),
        GroupKind::Manual => "Chosen".to_string(),
    }
}

fn optional_string(value: Option<&str>) -> JsonValue {
    match value {
        Some(v) => JsonValue::String(v.to_string()),
        None => JsonValue::Null,
    }
}

fn fit_column(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width <= 3 {
        return value.chars().take(width).collect();
    }

    let mut out = String::with_capacity(width);
    for ch in value.chars().take(width - 3) {
        out.push(ch);
    }
    out.push_str("...");
    out
}

fn centered_no_trailing(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        return value.to_string();
    }

    let left_padding = (width - len) / 2;
    format!("{}{}", " ".repeat(left_padding), value)
}
