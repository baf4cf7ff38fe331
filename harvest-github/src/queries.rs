//! GraphQL documents used by the harvester
//!
//! Every paginated query takes `$first` and `$after`; the page walker owns
//! `$after`.

/// Popular repositories with their pull request totals
pub const REPOSITORY_SEARCH: &str = r#"
query RepositorySearch($query: String!, $first: Int!, $after: String) {
  search(query: $query, type: REPOSITORY, first: $first, after: $after) {
    edges {
      node {
        ... on Repository {
          owner { login }
          name
          pullRequests { totalCount }
        }
      }
    }
    pageInfo {
      hasNextPage
      endCursor
    }
  }
}
"#;

/// Path of the search connection inside `data`
pub const REPOSITORY_SEARCH_PATH: &[&str] = &["search"];

/// Pull requests of one repository with review details
pub const PULL_REQUESTS: &str = r#"
query PullRequests($owner: String!, $name: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: $first, after: $after) {
      nodes {
        number
        title
        author { login }
        createdAt
        mergedAt
        closedAt
        additions
        deletions
        changedFiles
        bodyText
        merged
        comments { totalCount }
        reviewThreads { totalCount }
        reviews(first: 100) {
          totalCount
          nodes {
            state
            submittedAt
            createdAt
          }
        }
      }
      pageInfo {
        hasNextPage
        endCursor
      }
    }
  }
}
"#;

/// Path of the pull request connection inside `data`
pub const PULL_REQUESTS_PATH: &[&str] = &["repository", "pullRequests"];

/// Total pull request count, for progress reporting
pub const PULL_REQUEST_TOTAL: &str = r#"
query PullRequestTotal($owner: String!, $name: String!) {
  repository(owner: $owner, name: $name) {
    pullRequests {
      totalCount
    }
  }
}
"#;
