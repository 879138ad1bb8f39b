//! User-configured task filters applied on top of the visibility policy.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::Task;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Project,
    Tag,
    Priority,
    Status,
    HasDue,
    Overdue,
    NameContains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterFormat {
    None,
    Text,
}

impl FilterKind {
    pub const ALL: [FilterKind; 7] = [
        FilterKind::Project,
        FilterKind::Tag,
        FilterKind::Priority,
        FilterKind::Status,
        FilterKind::HasDue,
        FilterKind::Overdue,
        FilterKind::NameContains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Project => "project",
            FilterKind::Tag => "tag",
            FilterKind::Priority => "priority",
            FilterKind::Status => "status",
            FilterKind::HasDue => "has_due",
            FilterKind::Overdue => "overdue",
            FilterKind::NameContains => "name_contains",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let needle = raw.trim().replace('-', "_");
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown filter type '{raw}'")))
    }

    pub fn parameter_format(&self) -> ParameterFormat {
        match self {
            FilterKind::HasDue | FilterKind::Overdue => ParameterFormat::None,
            _ => ParameterFormat::Text,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskFilter {
    pub kind: FilterKind,
    #[serde(default)]
    pub parameter: String,
    /// Keep matching tasks when true, hide them when false.
    #[serde(default = "default_true")]
    pub include: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl TaskFilter {
    pub fn new(kind: FilterKind, parameter: impl Into<String>, include: bool) -> Result<Self> {
        let parameter = match kind.parameter_format() {
            ParameterFormat::None => String::new(),
            ParameterFormat::Text => {
                let parameter = parameter.into().trim().to_string();
                if parameter.is_empty() {
                    return Err(Error::InvalidArgument(format!(
                        "filter type '{kind}' needs a parameter"
                    )));
                }
                parameter
            }
        };
        Ok(Self {
            kind,
            parameter,
            include,
            enabled: true,
        })
    }

    fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let param = self.parameter.as_str();
        match self.kind {
            FilterKind::Project => task
                .project
                .as_deref()
                .map(|project| project == param || project.starts_with(&format!("{param}.")))
                .unwrap_or(false),
            FilterKind::Tag => task.tags.iter().any(|tag| tag == param),
            FilterKind::Priority => task
                .priority
                .as_deref()
                .map(|priority| priority.eq_ignore_ascii_case(param))
                .unwrap_or(false),
            FilterKind::Status => task.status == param,
            FilterKind::HasDue => task.due.is_some(),
            FilterKind::Overdue => task.due.map(|due| due < now).unwrap_or(false),
            FilterKind::NameContains => task
                .name
                .to_lowercase()
                .contains(&param.to_lowercase()),
        }
    }

    /// Whether `task` survives this filter.
    pub fn admits(&self, task: &Task, now: DateTime<Utc>) -> bool {
        !self.enabled || self.matches(task, now) == self.include
    }

    /// Human description, e.g. "Exclude tasks tagged 'work'".
    pub fn friendly(&self) -> String {
        let verb = if self.include { "Include" } else { "Exclude" };
        let what = match self.kind {
            FilterKind::Project => format!("in project '{}'", self.parameter),
            FilterKind::Tag => format!("tagged '{}'", self.parameter),
            FilterKind::Priority => format!("with priority '{}'", self.parameter),
            FilterKind::Status => format!("with status '{}'", self.parameter),
            FilterKind::HasDue => "with a due date".to_string(),
            FilterKind::Overdue => "past their due date".to_string(),
            FilterKind::NameContains => format!("named like '{}'", self.parameter),
        };
        format!("{verb} tasks {what}")
    }

    fn same_rule(&self, other: &TaskFilter) -> bool {
        self.kind == other.kind && self.parameter == other.parameter && self.include == other.include
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FilterSet {
    filters: Vec<TaskFilter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &[TaskFilter] {
        &self.filters
    }

    /// Add a filter. Returns false if an identical rule already exists.
    pub fn add(&mut self, filter: TaskFilter) -> bool {
        if self.filters.iter().any(|existing| existing.same_rule(&filter)) {
            return false;
        }
        self.filters.push(filter);
        true
    }

    pub fn remove(&mut self, index: usize) -> Option<TaskFilter> {
        (index < self.filters.len()).then(|| self.filters.remove(index))
    }

    /// Flip the enabled flag, returning the new state.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let filter = self.filters.get_mut(index)?;
        filter.enabled = !filter.enabled;
        Some(filter.enabled)
    }

    pub fn admits(&self, task: &Task, now: DateTime<Utc>) -> bool {
        self.filters.iter().all(|filter| filter.admits(task, now))
    }

    pub fn apply(&self, tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
        tasks
            .into_iter()
            .filter(|task| self.admits(task, now))
            .collect()
    }
}

/// Distinct values of `kind` across `tasks` that start with `prefix`.
pub fn autocompletes(kind: FilterKind, prefix: &str, tasks: &[Task]) -> Vec<String> {
    let mut values = BTreeSet::new();
    for task in tasks {
        match kind {
            FilterKind::Project => values.extend(task.project.iter().cloned()),
            FilterKind::Tag => values.extend(task.tags.iter().cloned()),
            FilterKind::Priority => values.extend(task.priority.iter().cloned()),
            FilterKind::Status => {
                values.insert(task.status.clone());
            }
            FilterKind::HasDue | FilterKind::Overdue | FilterKind::NameContains => {}
        }
    }
    values
        .into_iter()
        .filter(|value| !value.is_empty() && value.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::now;
    use chrono::Duration;

    fn task(name: &str, project: Option<&str>, tags: &[&str]) -> Task {
        let mut task = Task::new(name);
        task.project = project.map(str::to_string);
        task.tags = tags.iter().map(|tag| tag.to_string()).collect();
        task
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let mut set = FilterSet::new();
        let filter = TaskFilter::new(FilterKind::Tag, "work", false).expect("filter");
        assert!(set.add(filter.clone()));
        assert!(!set.add(filter));
        let opposite = TaskFilter::new(FilterKind::Tag, "work", true).expect("filter");
        assert!(set.add(opposite));
        assert_eq!(set.filters().len(), 2);
    }

    #[test]
    fn text_filters_require_parameter() {
        assert!(TaskFilter::new(FilterKind::Project, "  ", true).is_err());
        let filter = TaskFilter::new(FilterKind::HasDue, "ignored", true).expect("filter");
        assert!(filter.parameter.is_empty());
    }

    #[test]
    fn project_filter_matches_subprojects() {
        let filter = TaskFilter::new(FilterKind::Project, "home", true).expect("filter");
        assert!(filter.admits(&task("a", Some("home.garden"), &[]), now()));
        assert!(!filter.admits(&task("b", Some("homework"), &[]), now()));
        assert!(!filter.admits(&task("c", None, &[]), now()));
    }

    #[test]
    fn exclude_and_disable() {
        let mut set = FilterSet::new();
        set.add(TaskFilter::new(FilterKind::Tag, "work", false).expect("filter"));
        let tasks = vec![task("a", None, &["work"]), task("b", None, &["home"])];
        let kept = set.apply(tasks.clone(), now());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "b");

        assert_eq!(set.toggle(0), Some(false));
        assert_eq!(set.apply(tasks, now()).len(), 2);
    }

    #[test]
    fn overdue_uses_now() {
        let filter = TaskFilter::new(FilterKind::Overdue, "", true).expect("filter");
        let mut late = Task::new("late");
        late.due = Some(now() - Duration::hours(1));
        let mut later = Task::new("later");
        later.due = Some(now() + Duration::hours(1));
        assert!(filter.admits(&late, now()));
        assert!(!filter.admits(&later, now()));
    }

    #[test]
    fn friendly_strings() {
        let filter = TaskFilter::new(FilterKind::Tag, "work", false).expect("filter");
        assert_eq!(filter.friendly(), "Exclude tasks tagged 'work'");
    }

    #[test]
    fn kind_parse_accepts_dashes() {
        assert_eq!(FilterKind::parse("has-due").expect("kind"), FilterKind::HasDue);
        assert!(FilterKind::parse("colour").is_err());
    }

    #[test]
    fn autocompletes_are_distinct_and_prefixed() {
        let tasks = vec![
            task("a", Some("home"), &["hobby", "work"]),
            task("b", Some("home"), &["health"]),
            task("c", Some("office"), &[]),
        ];
        assert_eq!(
            autocompletes(FilterKind::Project, "", &tasks),
            vec!["home", "office"]
        );
        assert_eq!(
            autocompletes(FilterKind::Tag, "h", &tasks),
            vec!["health", "hobby"]
        );
        assert!(autocompletes(FilterKind::HasDue, "", &tasks).is_empty());
    }
}
