//! A builder accumulating enrollment calls onto a single transaction

use clap::ValueEnum;
use ledger_client::{
    Keypair, LedgerClient, MoveTarget, ObjectId, PendingTransaction, SubmissionOutcome,
    TransactionBuilder,
};
use tracing::info;

use crate::error::{ScriptError, ensure_success};

/// The module defining cohorts and enrollments
pub const ENROLLMENT_MODULE: &str = "enrollment";

/// An enrollment call that can be queued from the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EnrollmentAction {
    /// Create a new cohort
    CreateCohort,
    /// Open or close signups for the cohort
    ToggleSignups,
    /// Enroll in the cohort under a GitHub handle
    Enroll,
    /// Update the enrolled GitHub handle
    Update,
}

/// Builds one transaction out of any number of enrollment calls
///
/// Calls are appended in the order they are made. A call that cannot be
/// made, e.g. `enroll` before a cohort is set, fails without touching the
/// pending transaction
#[derive(Debug)]
pub struct Enrollment {
    /// The package defining the enrollment module
    package: ObjectId,
    /// The instructor capability, required by instructor-only calls
    instructor_cap: Option<ObjectId>,
    /// The cohort operated on
    cohort: Option<ObjectId>,
    /// The transaction under construction
    builder: TransactionBuilder,
}

impl Enrollment {
    /// Create a builder for the given package
    pub fn new(package: ObjectId) -> Self {
        Self { package, instructor_cap: None, cohort: None, builder: TransactionBuilder::new() }
    }

    // -----------
    // | Setters |
    // -----------

    /// Point subsequent calls at a different package
    pub fn with_package(&mut self, package: ObjectId) -> &mut Self {
        self.package = package;
        self
    }

    /// Set the instructor capability
    pub fn with_instructor_cap(&mut self, instructor_cap: ObjectId) -> &mut Self {
        self.instructor_cap = Some(instructor_cap);
        self
    }

    /// Set the cohort
    pub fn with_cohort(&mut self, cohort: ObjectId) -> &mut Self {
        self.cohort = Some(cohort);
        self
    }

    // ---------
    // | Calls |
    // ---------

    /// Create a new cohort
    pub fn create_cohort(&mut self) -> Result<&mut Self, ScriptError> {
        let cap = self.instructor_cap.ok_or(ScriptError::MissingInstructorCap)?;

        let target = self.target("create_cohort")?;
        let cap = self.builder.object(cap)?;
        self.builder.move_call(target, vec![], vec![cap])?;
        Ok(self)
    }

    /// Open or close signups for the cohort
    pub fn toggle_signups(&mut self) -> Result<&mut Self, ScriptError> {
        let cohort = self.cohort.ok_or(ScriptError::MissingCohort)?;
        let cap = self.instructor_cap.ok_or(ScriptError::MissingInstructorCap)?;

        let target = self.target("toggle_signups")?;
        let cap = self.builder.object(cap)?;
        let cohort = self.builder.object(cohort)?;
        self.builder.move_call(target, vec![], vec![cap, cohort])?;
        Ok(self)
    }

    /// Enroll the signer in the cohort under a GitHub handle
    pub fn enroll(&mut self, github: &str) -> Result<&mut Self, ScriptError> {
        self.cohort_call("enroll", github)
    }

    /// Update the signer's GitHub handle in the cohort
    pub fn update(&mut self, github: &str) -> Result<&mut Self, ScriptError> {
        self.cohort_call("update", github)
    }

    /// Queue a call by action, taking the GitHub handle for the calls that
    /// need one
    pub fn apply(
        &mut self,
        action: EnrollmentAction,
        github: Option<&str>,
    ) -> Result<&mut Self, ScriptError> {
        match action {
            EnrollmentAction::CreateCohort => self.create_cohort(),
            EnrollmentAction::ToggleSignups => self.toggle_signups(),
            EnrollmentAction::Enroll => self.enroll(Self::require_github(github)?),
            EnrollmentAction::Update => self.update(Self::require_github(github)?),
        }
    }

    // --------------
    // | Submission |
    // --------------

    /// Consume the builder, producing the pending transaction
    pub fn finish(self) -> PendingTransaction {
        self.builder.finish()
    }

    /// Sign and submit the accumulated calls
    pub async fn submit<C: LedgerClient + ?Sized>(
        self,
        client: &C,
        signer: &Keypair,
    ) -> Result<SubmissionOutcome, ScriptError> {
        let tx = self.finish();
        info!("submitting {} enrollment calls", tx.instructions().len());

        let outcome = client.submit(tx, signer).await.map_err(ScriptError::submission)?;
        ensure_success(outcome)
    }

    // -----------
    // | Helpers |
    // -----------

    /// A call taking the cohort and a GitHub handle
    fn cohort_call(&mut self, function: &str, github: &str) -> Result<&mut Self, ScriptError> {
        let cohort = self.cohort.ok_or(ScriptError::MissingCohort)?;

        let target = self.target(function)?;
        let cohort = self.builder.object(cohort)?;
        let github = self.builder.pure_bytes(github.as_bytes())?;
        self.builder.move_call(target, vec![], vec![cohort, github])?;
        Ok(self)
    }

    /// The GitHub handle, which `enroll` and `update` require
    fn require_github(github: Option<&str>) -> Result<&str, ScriptError> {
        github.ok_or_else(|| ScriptError::config("a GitHub handle is required"))
    }

    /// A function in the enrollment module
    fn target(&self, function: &str) -> Result<MoveTarget, ScriptError> {
        Ok(MoveTarget::new(self.package, ENROLLMENT_MODULE, function)?)
    }
}
