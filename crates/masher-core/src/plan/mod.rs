use masher_model::{Release, RepoName, Request, Tag, UpdateStatus};

const UPDATES: &str = "updates";
const UPDATES_TESTING: &str = "updates-testing";
const UPDATES_CANDIDATE: &str = "updates-candidate";

/// Where one update's build goes and which repositories have to be recomposed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub target_tag: Tag,
    pub repos: Vec<RepoName>,
}

impl MovePlan {
    pub fn new(request: Request, status: UpdateStatus, release: &Release) -> Self {
        match request {
            Request::Move => Self {
                target_tag: release.tag(UPDATES),
                repos: vec![
                    release.repo_name(UPDATES),
                    release.repo_name(UPDATES_TESTING),
                ],
            },
            Request::Push => Self {
                target_tag: release.tag(UPDATES_TESTING),
                repos: vec![release.repo_name(UPDATES_TESTING)],
            },
            Request::Unpush => {
                let repos = match status {
                    UpdateStatus::Testing => vec![release.repo_name(UPDATES_TESTING)],
                    UpdateStatus::Stable => vec![release.repo_name(UPDATES)],
                    _ => Vec::new(),
                };
                Self {
                    target_tag: release.tag(UPDATES_CANDIDATE),
                    repos,
                }
            }
        }
    }

    pub fn for_update(update: &dyn masher_model::Update) -> Self {
        Self::new(update.request(), update.status(), update.release())
    }
}
