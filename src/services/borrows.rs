//! Borrow workflow: checkout, return, history and admin corrections

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    inventory::{self, BorrowPolicy},
    models::{
        borrow::{BorrowRecordDetails, UpdateBorrowRecord},
        enums::BorrowStatus,
        page::{PageRequest, PagedResponse},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowService {
    repository: Repository,
    policy: BorrowPolicy,
}

impl BorrowService {
    pub fn new(repository: Repository, policy: BorrowPolicy) -> Self {
        Self { repository, policy }
    }

    /// Borrow one copy of a book for the principal
    pub async fn borrow(&self, principal: &UserClaims, book_id: i64) -> AppResult<BorrowRecordDetails> {
        let policy = self.policy;
        let user_id = principal.user_id;

        let record = self
            .repository
            .borrows
            .checkout(user_id, book_id, |active, book| {
                policy.checkout(user_id, active, book, today())
            })
            .await?;

        tracing::info!(
            "User {} borrowed book {} (record {}, due {})",
            user_id,
            book_id,
            record.id,
            record.due_date
        );
        Ok(record)
    }

    /// Return one of the principal's own borrows
    pub async fn return_book(&self, principal: &UserClaims, record_id: i64) -> AppResult<BorrowRecordDetails> {
        let user_id = principal.user_id;

        let record = self
            .repository
            .borrows
            .reconcile(record_id, |record, book| {
                if record.user_id != user_id {
                    return Err(AppError::Authorization(
                        "You can only return your own books".to_string(),
                    ));
                }
                inventory::check_in(record, book, today())
            })
            .await?;

        tracing::info!("User {} returned record {}", user_id, record.id);
        Ok(record)
    }

    pub async fn my_history(
        &self,
        principal: &UserClaims,
        page: PageRequest,
        status: Option<BorrowStatus>,
    ) -> AppResult<PagedResponse<BorrowRecordDetails>> {
        let (records, total) = self
            .repository
            .borrows
            .list(page, Some(principal.user_id), status)
            .await?;
        Ok(PagedResponse::new(records, page, total))
    }

    pub async fn my_history_all(&self, principal: &UserClaims) -> AppResult<Vec<BorrowRecordDetails>> {
        self.repository.borrows.list_all(Some(principal.user_id)).await
    }

    pub async fn all_records(
        &self,
        page: PageRequest,
        status: Option<BorrowStatus>,
    ) -> AppResult<PagedResponse<BorrowRecordDetails>> {
        let (records, total) = self.repository.borrows.list(page, None, status).await?;
        Ok(PagedResponse::new(records, page, total))
    }

    pub async fn all_records_unpaged(&self) -> AppResult<Vec<BorrowRecordDetails>> {
        self.repository.borrows.list_all(None).await
    }

    /// Records of one user; the user must exist
    pub async fn user_records(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<PagedResponse<BorrowRecordDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        let (records, total) = self
            .repository
            .borrows
            .list(page, Some(user_id), None)
            .await?;
        Ok(PagedResponse::new(records, page, total))
    }

    /// Force a record to `status`, moving the copy on or off the shelf to match
    pub async fn override_status(&self, record_id: i64, status: BorrowStatus) -> AppResult<BorrowRecordDetails> {
        let record = self
            .repository
            .borrows
            .reconcile(record_id, |record, book| {
                let changed = inventory::change_status(record, book, status, today())?;
                if !changed {
                    tracing::debug!("Record {} already {}", record.id, status);
                }
                Ok(())
            })
            .await?;

        tracing::info!("Record {} overridden to {}", record.id, record.status);
        Ok(record)
    }

    /// Admin edit of status and due date
    pub async fn update_record(
        &self,
        record_id: i64,
        update: UpdateBorrowRecord,
    ) -> AppResult<BorrowRecordDetails> {
        let record = self
            .repository
            .borrows
            .reconcile(record_id, |record, book| {
                inventory::apply_record_update(record, book, &update, today())
            })
            .await?;

        tracing::info!(
            "Record {} updated: status {}, due {}",
            record.id,
            record.status,
            record.due_date
        );
        Ok(record)
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.repository.borrows.count().await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
