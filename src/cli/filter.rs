//! taskmirror filter command implementations.

use serde::Serialize;

use crate::cli::{load_session, GlobalOptions, Session};
use crate::error::{Error, Result};
use crate::filter::{FilterKind, TaskFilter};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct FilterListOutput<'a> {
    total: usize,
    filters: &'a [TaskFilter],
}

#[derive(Serialize)]
struct FilterChangedOutput {
    index: usize,
    filter: TaskFilter,
}

fn filter_line(index: usize, filter: &TaskFilter) -> String {
    let state = if filter.enabled { "on" } else { "off" };
    format!("{index}: [{state}] {}", filter.friendly())
}

fn out_of_range(session: &Session, index: usize) -> Error {
    let total = session.repository().filters().filters().len();
    Error::InvalidArgument(format!(
        "no filter at index {index} ({total} configured)"
    ))
}

pub async fn run_add(
    global: &GlobalOptions,
    kind: &str,
    parameter: &str,
    include: bool,
) -> Result<()> {
    let kind = FilterKind::parse(kind)?;
    let filter = TaskFilter::new(kind, parameter.trim(), include)?;

    let mut session = load_session(global).await?;
    if !session.repository_mut().filters_mut().add(filter.clone()) {
        return Err(Error::InvalidArgument(format!(
            "filter already exists: {}",
            filter.friendly()
        )));
    }
    session.repository().save_filters()?;
    let index = session.repository().filters().filters().len() - 1;

    let mut human = HumanOutput::new("Filter added");
    human.push_summary("Index", index.to_string());
    human.push_summary("Filter", filter.friendly());

    emit_success(
        global.output,
        "filter add",
        &FilterChangedOutput { index, filter },
        Some(&human),
    )
}

pub async fn run_list(global: &GlobalOptions) -> Result<()> {
    let session = load_session(global).await?;
    let filters = session.repository().filters().filters();

    let mut human = HumanOutput::new("Filters");
    human.push_summary("Total", filters.len().to_string());
    for (index, filter) in filters.iter().enumerate() {
        human.push_detail(filter_line(index, filter));
    }

    emit_success(
        global.output,
        "filter list",
        &FilterListOutput {
            total: filters.len(),
            filters,
        },
        Some(&human),
    )
}

pub async fn run_remove(global: &GlobalOptions, index: usize) -> Result<()> {
    let mut session = load_session(global).await?;
    let Some(filter) = session.repository_mut().filters_mut().remove(index) else {
        return Err(out_of_range(&session, index));
    };
    session.repository().save_filters()?;

    let mut human = HumanOutput::new("Filter removed");
    human.push_summary("Filter", filter.friendly());

    emit_success(
        global.output,
        "filter remove",
        &FilterChangedOutput { index, filter },
        Some(&human),
    )
}

pub async fn run_toggle(global: &GlobalOptions, index: usize) -> Result<()> {
    let mut session = load_session(global).await?;
    if session.repository_mut().filters_mut().toggle(index).is_none() {
        return Err(out_of_range(&session, index));
    }
    session.repository().save_filters()?;

    let filter = session.repository().filters().filters()[index].clone();
    let mut human = HumanOutput::new(if filter.enabled {
        "Filter enabled"
    } else {
        "Filter disabled"
    });
    human.push_detail(filter_line(index, &filter));

    emit_success(
        global.output,
        "filter toggle",
        &FilterChangedOutput { index, filter },
        Some(&human),
    )
}
