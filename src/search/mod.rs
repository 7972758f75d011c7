//! Catalogue filtering and dashboard statistics.
//!
//! Every filter is a case-insensitive substring match over display fields,
//! recomputed from the store's collections on each call. An empty term
//! matches everything.

use std::cmp::Reverse;

use chrono::{DateTime, FixedOffset};

use crate::models::{Category, Tutorial, TutorialProblem, TutorialRequest, User};

/// Moderation status filter for the admin tutorial list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Approved,
}

impl StatusFilter {
    fn accepts(&self, tutorial: &Tutorial) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => !tutorial.approved,
            StatusFilter::Approved => tutorial.approved,
        }
    }
}

/// Ordering of the request board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestSort {
    /// Most upvotes first.
    #[default]
    Popular,
    /// Newest first.
    Recent,
}

/// Lowercased search term, matched against any number of fields.
struct Needle(String);

impl Needle {
    fn new(term: &str) -> Self {
        Needle(term.trim().to_lowercase())
    }

    fn matches_any(&self, fields: &[&str]) -> bool {
        self.0.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&self.0))
    }
}

/// Published tutorials matching `query` in title or description.
pub fn public_tutorials<'a>(
    tutorials: &'a [Tutorial],
    query: &str,
    category: Option<Category>,
) -> Vec<&'a Tutorial> {
    let needle = Needle::new(query);
    tutorials
        .iter()
        .filter(|t| t.approved)
        .filter(|t| category.is_none_or(|c| t.category == c))
        .filter(|t| needle.matches_any(&[t.title.as_str(), t.description.as_str()]))
        .collect()
}

/// Admin view: every tutorial matching `term` in title or author name.
pub fn admin_tutorials<'a>(
    tutorials: &'a [Tutorial],
    term: &str,
    status: StatusFilter,
) -> Vec<&'a Tutorial> {
    let needle = Needle::new(term);
    tutorials
        .iter()
        .filter(|t| status.accepts(t))
        .filter(|t| needle.matches_any(&[t.title.as_str(), t.author_name.as_str()]))
        .collect()
}

pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let needle = Needle::new(term);
    users
        .iter()
        .filter(|u| needle.matches_any(&[u.name.as_str(), u.email.as_str()]))
        .collect()
}

pub fn filter_requests<'a>(
    requests: &'a [TutorialRequest],
    query: &str,
    category: Option<Category>,
    sort: RequestSort,
) -> Vec<&'a TutorialRequest> {
    let needle = Needle::new(query);
    let mut matches: Vec<&TutorialRequest> = requests
        .iter()
        .filter(|r| category.is_none_or(|c| r.category == c))
        .filter(|r| needle.matches_any(&[r.title.as_str(), r.description.as_str()]))
        .collect();

    match sort {
        RequestSort::Popular => matches.sort_by_key(|r| Reverse(r.upvotes)),
        RequestSort::Recent => matches.sort_by(|a, b| {
            match (parse_timestamp(&a.created_at), parse_timestamp(&b.created_at)) {
                (Some(a), Some(b)) => b.cmp(&a),
                _ => b.created_at.cmp(&a.created_at),
            }
        }),
    }
    matches
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

pub fn problems_for_tutorial<'a>(
    problems: &'a [TutorialProblem],
    tutorial_id: &str,
) -> Vec<&'a TutorialProblem> {
    problems
        .iter()
        .filter(|p| p.tutorial_id == tutorial_id)
        .collect()
}

/// The tutorials `user` has saved, in catalogue order.
pub fn saved_tutorials<'a>(tutorials: &'a [Tutorial], user: &User) -> Vec<&'a Tutorial> {
    tutorials
        .iter()
        .filter(|t| user.saved_tutorials.contains(&t.id))
        .collect()
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total_tutorials: usize,
    pub pending_tutorials: usize,
    pub approved_tutorials: usize,
    pub total_users: usize,
    pub banned_users: usize,
    pub total_comments: usize,
    pub total_problems: usize,
    pub unresolved_problems: usize,
    pub total_requests: usize,
    pub unanswered_requests: usize,
}

impl DashboardStats {
    pub fn compute(
        tutorials: &[Tutorial],
        users: &[User],
        problems: &[TutorialProblem],
        requests: &[TutorialRequest],
    ) -> Self {
        let approved_tutorials = tutorials.iter().filter(|t| t.approved).count();
        Self {
            total_tutorials: tutorials.len(),
            pending_tutorials: tutorials.len() - approved_tutorials,
            approved_tutorials,
            total_users: users.len(),
            banned_users: users.iter().filter(|u| u.banned).count(),
            total_comments: tutorials.iter().map(|t| t.comments.len()).sum(),
            total_problems: problems.len(),
            unresolved_problems: problems.iter().filter(|p| !p.resolved).count(),
            total_requests: requests.len(),
            unanswered_requests: requests.iter().filter(|r| !r.answered).count(),
        }
    }
}
