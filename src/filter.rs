use rocket::FromForm;
use sqlx::{QueryBuilder, Sqlite};

use crate::auth::User;
use crate::validation::non_blank;

/// Query-string parameters accepted by the internship listing.
#[derive(Debug, Default, Clone, FromForm)]
pub struct InternshipQuery {
    pub q: Option<String>,
    pub domain: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    #[field(name = "cgpaCutoff")]
    pub cgpa_cutoff: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Branch set is empty or contains this branch.
    BranchEligible(String),
    /// Substring over title, company, location, description, skills and domain tags.
    Search(String),
    Domain(String),
    Location(String),
    Company(String),
    CgpaCutoff(f64),
}

/// A conjunction of clauses over the `internships` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternshipFilter {
    clauses: Vec<Clause>,
}

impl InternshipFilter {
    pub fn new(query: &InternshipQuery, caller: Option<&User>) -> Self {
        let mut clauses = Vec::new();

        if let Some(branch) = caller.and_then(User::eligibility_branch) {
            clauses.push(Clause::BranchEligible(branch.to_string()));
        }

        if let Some(q) = non_blank(query.q.as_deref()) {
            clauses.push(Clause::Search(q.to_string()));
        }
        if let Some(domain) = non_blank(query.domain.as_deref()) {
            clauses.push(Clause::Domain(domain.to_string()));
        }
        if let Some(location) = non_blank(query.location.as_deref()) {
            clauses.push(Clause::Location(location.to_string()));
        }
        if let Some(company) = non_blank(query.company.as_deref()) {
            clauses.push(Clause::Company(company.to_string()));
        }
        if let Some(cgpa) = non_blank(query.cgpa_cutoff.as_deref())
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|value| value.is_finite())
        {
            clauses.push(Clause::CgpaCutoff(cgpa));
        }

        Self { clauses }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Appends ` WHERE ...` (or nothing) to a query selecting from `internships`.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        if self.clauses.is_empty() {
            return;
        }

        builder.push(" WHERE ");
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                builder.push(" AND ");
            }
            push_clause(builder, clause);
        }
    }
}

fn push_contains(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, needle: &str) {
    builder
        .push(format!("instr(lower(internships.{column}), lower("))
        .push_bind(needle.to_string())
        .push(")) > 0");
}

fn push_any_tag_contains(builder: &mut QueryBuilder<'_, Sqlite>, column: &str, needle: &str) {
    builder
        .push(format!(
            "EXISTS (SELECT 1 FROM json_each(internships.{column}) AS tag WHERE instr(lower(tag.value), lower("
        ))
        .push_bind(needle.to_string())
        .push(")) > 0)");
}

fn push_clause(builder: &mut QueryBuilder<'_, Sqlite>, clause: &Clause) {
    match clause {
        Clause::BranchEligible(branch) => {
            builder
                .push("(json_array_length(internships.branch) = 0 OR EXISTS (SELECT 1 FROM json_each(internships.branch) AS tag WHERE tag.value = ")
                .push_bind(branch.clone())
                .push("))");
        }
        Clause::Search(q) => {
            builder.push("(");
            for (index, column) in ["title", "company_name", "location", "description"]
                .into_iter()
                .enumerate()
            {
                if index > 0 {
                    builder.push(" OR ");
                }
                push_contains(builder, column, q);
            }
            builder.push(" OR ");
            push_any_tag_contains(builder, "skills", q);
            builder.push(" OR ");
            push_any_tag_contains(builder, "domain", q);
            builder.push(")");
        }
        Clause::Domain(domain) => push_any_tag_contains(builder, "domain", domain),
        Clause::Location(location) => push_contains(builder, "location", location),
        Clause::Company(company) => push_contains(builder, "company_name", company),
        Clause::CgpaCutoff(cgpa) => {
            builder.push("internships.cgpa_cutoff = ").push_bind(*cgpa);
        }
    }
}
