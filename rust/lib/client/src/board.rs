use tracing::warn;

use bugs::model::{Bug, CreateBug};

use crate::client::BugClient;
use crate::error::ClientError;

/// Where a listed bug came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Read from the server's list.
    Fetched,
    /// Taken from a create response but not yet confirmed by a list read.
    Local,
}

/// Fields of the "report bug" form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugForm {
    pub title: String,
    pub description: String,
}

impl BugForm {
    fn to_request(&self) -> CreateBug {
        CreateBug {
            title: self.title.clone(),
            description: Some(self.description.clone()),
            status: None,
        }
    }
}

/// View state of the bug board: the listed bugs plus the report form.
///
/// The board only lists and reports bugs. After every successful report it
/// re-reads the list from the server; if that read fails, the created bug is
/// merged by id and marked [`Origin::Local`] until the next successful read.
pub struct BugBoard {
    client: BugClient,
    items: Vec<(Bug, Origin)>,
    pub form: BugForm,
}

impl BugBoard {
    pub fn new(client: BugClient) -> Self {
        Self {
            client,
            items: Vec::new(),
            form: BugForm::default(),
        }
    }

    /// Bugs currently shown, in server order.
    pub fn bugs(&self) -> impl Iterator<Item = &Bug> {
        self.items.iter().map(|(bug, _)| bug)
    }

    pub fn items(&self) -> &[(Bug, Origin)] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace local state with the server's list.
    pub async fn load(&mut self) -> Result<(), ClientError> {
        let bugs = self.client.list().await?;
        self.items = bugs.into_iter().map(|bug| (bug, Origin::Fetched)).collect();
        Ok(())
    }

    /// Submit the form. On success the form is cleared and the board is
    /// reconciled with the server; the created bug is returned.
    ///
    /// A failed create leaves both the form and the list untouched.
    pub async fn submit(&mut self) -> Result<Bug, ClientError> {
        let created = self.client.create(&self.form.to_request()).await?;
        self.form = BugForm::default();

        if let Err(e) = self.load().await {
            warn!(error = %e, id = %created.id, "re-fetch after submit failed; keeping local copy");
            self.merge(created.clone(), Origin::Local);
        }
        Ok(created)
    }

    /// Insert or replace by id.
    fn merge(&mut self, bug: Bug, origin: Origin) {
        match self.items.iter_mut().find(|(existing, _)| existing.id == bug.id) {
            Some(slot) => *slot = (bug, origin),
            None => self.items.push((bug, origin)),
        }
    }

    /// One line per bug: `title - status`.
    pub fn render(&self) -> Vec<String> {
        self.bugs()
            .map(|bug| format!("{} - {}", bug.title, bug.status))
            .collect()
    }
}
