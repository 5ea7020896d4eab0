//! Inventory reconciliation rules.
//!
//! Every operation that moves a copy on or off the shelf goes through these
//! functions. They mutate in-memory `Book` and `BorrowRecord` values only;
//! the repository loads both rows under a row lock inside one transaction,
//! applies a rule and writes both back before committing.
//!
//! Invariants kept here:
//! - `0 <= available_copies <= total_copies` for every book,
//! - `return_date.is_some()` iff the record status is `RETURNED`.

use chrono::{Duration, NaiveDate};

use crate::{
    config::BorrowingConfig,
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrow::{BorrowRecord, NewBorrowRecord, UpdateBorrowRecord},
        enums::BorrowStatus,
    },
};

/// Borrowing limits applied at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowPolicy {
    pub max_active_borrows: i64,
    pub loan_period_days: i64,
}

impl Default for BorrowPolicy {
    fn default() -> Self {
        Self {
            max_active_borrows: 3,
            loan_period_days: 14,
        }
    }
}

impl From<&BorrowingConfig> for BorrowPolicy {
    fn from(config: &BorrowingConfig) -> Self {
        Self {
            max_active_borrows: config.max_active_borrows,
            loan_period_days: config.loan_period_days,
        }
    }
}

impl BorrowPolicy {
    /// Take one copy of `book` off the shelf for `user_id`.
    ///
    /// The limit check comes first so a member at the cap is told so even
    /// when the book is unavailable.
    pub fn checkout(
        &self,
        user_id: i64,
        active_borrows: i64,
        book: &mut Book,
        today: NaiveDate,
    ) -> AppResult<NewBorrowRecord> {
        if active_borrows >= self.max_active_borrows {
            return Err(AppError::LimitExceeded(format!(
                "User has reached the maximum borrowing limit of {}",
                self.max_active_borrows
            )));
        }

        if book.available_copies <= 0 {
            return Err(AppError::Unavailable("Book is currently unavailable".to_string()));
        }

        book.available_copies -= 1;

        Ok(NewBorrowRecord {
            user_id,
            book_id: book.id,
            borrow_date: today,
            due_date: today + Duration::days(self.loan_period_days),
            status: BorrowStatus::Borrowed,
        })
    }
}

/// Close an active borrow and put the copy back on the shelf
pub fn check_in(record: &mut BorrowRecord, book: &mut Book, today: NaiveDate) -> AppResult<()> {
    if record.status == BorrowStatus::Returned {
        return Err(AppError::InvalidState("Book is already returned".to_string()));
    }

    release_copy(book)?;
    record.status = BorrowStatus::Returned;
    record.return_date = Some(today);
    Ok(())
}

/// Move a record to `new_status`, adjusting the shelf count to match.
///
/// Returns whether inventory changed. Setting the current status again is a
/// no-op.
pub fn change_status(
    record: &mut BorrowRecord,
    book: &mut Book,
    new_status: BorrowStatus,
    today: NaiveDate,
) -> AppResult<bool> {
    match (record.status, new_status) {
        (BorrowStatus::Borrowed, BorrowStatus::Returned) => {
            release_copy(book)?;
            record.return_date = Some(today);
        }
        (BorrowStatus::Returned, BorrowStatus::Borrowed) => {
            if book.available_copies <= 0 {
                return Err(AppError::InvalidState(
                    "Cannot change status to BORROWED: No available copies".to_string(),
                ));
            }
            book.available_copies -= 1;
            record.return_date = None;
        }
        _ => return Ok(false),
    }

    record.status = new_status;
    Ok(true)
}

/// Apply an admin edit: status first, then the due date independently
pub fn apply_record_update(
    record: &mut BorrowRecord,
    book: &mut Book,
    update: &UpdateBorrowRecord,
    today: NaiveDate,
) -> AppResult<()> {
    if let Some(status) = update.status {
        change_status(record, book, status, today)?;
    }

    if let Some(due_date) = update.due_date {
        record.due_date = due_date;
    }

    Ok(())
}

/// Change the number of copies owned while keeping loans outstanding
pub fn resize(book: &mut Book, new_total: i32) -> AppResult<()> {
    if new_total < 0 {
        return Err(AppError::Validation("Total copies cannot be negative".to_string()));
    }

    let on_loan = book.borrowed_copies();
    if new_total < on_loan {
        return Err(AppError::InvalidState(format!(
            "Cannot reduce total copies to {} while {} copies are on loan",
            new_total, on_loan
        )));
    }

    book.total_copies = new_total;
    book.available_copies = new_total - on_loan;
    Ok(())
}

fn release_copy(book: &mut Book) -> AppResult<()> {
    if book.available_copies >= book.total_copies {
        return Err(AppError::InvalidState(format!(
            "All {} copies of book {} are already on the shelf",
            book.total_copies, book.id
        )));
    }
    book.available_copies += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn book(total: i32, available: i32) -> Book {
        Book {
            id: 7,
            title: "The Left Hand of Darkness".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            isbn: "0441478123".to_string(),
            total_copies: total,
            available_copies: available,
            image_url: None,
        }
    }

    fn record_from(new: NewBorrowRecord, id: i64) -> BorrowRecord {
        BorrowRecord {
            id,
            user_id: new.user_id,
            book_id: new.book_id,
            borrow_date: new.borrow_date,
            due_date: new.due_date,
            return_date: None,
            status: new.status,
        }
    }

    fn assert_shelf_invariant(book: &Book) {
        assert!(book.available_copies >= 0, "negative stock: {:?}", book);
        assert!(book.available_copies <= book.total_copies, "overstock: {:?}", book);
    }

    #[test]
    fn test_checkout_sets_dates_and_decrements() {
        let policy = BorrowPolicy::default();
        let mut b = book(2, 2);

        let new = policy.checkout(1, 0, &mut b, day(1)).unwrap();

        assert_eq!(b.available_copies, 1);
        assert_eq!(new.status, BorrowStatus::Borrowed);
        assert_eq!(new.borrow_date, day(1));
        assert_eq!(new.due_date, day(15));
        assert_eq!(new.book_id, 7);
        assert_eq!(new.user_id, 1);
    }

    #[test]
    fn test_two_copies_then_unavailable() {
        let policy = BorrowPolicy::default();
        let mut b = book(2, 2);

        policy.checkout(1, 0, &mut b, day(1)).unwrap();
        assert_eq!(b.available_copies, 1);
        policy.checkout(2, 0, &mut b, day(1)).unwrap();
        assert_eq!(b.available_copies, 0);

        let err = policy.checkout(3, 0, &mut b, day(1)).unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert_eq!(b.available_copies, 0);
    }

    #[test]
    fn test_limit_reached_regardless_of_availability() {
        let policy = BorrowPolicy::default();
        let mut b = book(5, 5);

        let err = policy.checkout(1, 3, &mut b, day(1)).unwrap_err();
        assert!(matches!(err, AppError::LimitExceeded(_)));
        assert_eq!(b.available_copies, 5);

        let mut empty = book(1, 0);
        let err = policy.checkout(1, 3, &mut empty, day(1)).unwrap_err();
        assert!(matches!(err, AppError::LimitExceeded(_)));
    }

    #[test]
    fn test_below_limit_succeeds() {
        let policy = BorrowPolicy::default();
        let mut b = book(5, 5);
        assert!(policy.checkout(1, 2, &mut b, day(1)).is_ok());
    }

    #[test]
    fn test_policy_from_config() {
        let policy = BorrowPolicy::from(&BorrowingConfig {
            max_active_borrows: 1,
            loan_period_days: 7,
        });
        let mut b = book(3, 3);
        let new = policy.checkout(1, 0, &mut b, day(1)).unwrap();
        assert_eq!(new.due_date, day(8));
        assert!(policy.checkout(1, 1, &mut b, day(1)).is_err());
    }

    #[test]
    fn test_check_in_restores_copy() {
        let policy = BorrowPolicy::default();
        let mut b = book(1, 1);
        let mut record = record_from(policy.checkout(1, 0, &mut b, day(1)).unwrap(), 1);

        check_in(&mut record, &mut b, day(5)).unwrap();

        assert_eq!(b.available_copies, 1);
        assert_eq!(record.status, BorrowStatus::Returned);
        assert_eq!(record.return_date, Some(day(5)));
    }

    #[test]
    fn test_double_return_rejected_without_inventory_change() {
        let policy = BorrowPolicy::default();
        let mut b = book(2, 2);
        let mut record = record_from(policy.checkout(1, 0, &mut b, day(1)).unwrap(), 1);
        policy.checkout(2, 0, &mut b, day(1)).unwrap();
        check_in(&mut record, &mut b, day(2)).unwrap();
        assert_eq!(b.available_copies, 1);

        let err = check_in(&mut record, &mut b, day(3)).unwrap_err();

        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(b.available_copies, 1);
        assert_eq!(record.return_date, Some(day(2)));
    }

    #[test]
    fn test_status_change_borrowed_to_returned() {
        let mut b = book(3, 1);
        let mut record = record_from(
            BorrowPolicy::default().checkout(1, 0, &mut book(3, 3), day(1)).unwrap(),
            1,
        );

        assert!(change_status(&mut record, &mut b, BorrowStatus::Returned, day(4)).unwrap());
        assert_eq!(b.available_copies, 2);
        assert_eq!(record.return_date, Some(day(4)));
        assert_eq!(record.status, BorrowStatus::Returned);
    }

    #[test]
    fn test_status_change_returned_to_borrowed_needs_copy() {
        let mut b = book(1, 0);
        let mut record = BorrowRecord {
            id: 1,
            user_id: 1,
            book_id: 7,
            borrow_date: day(1),
            due_date: day(15),
            return_date: Some(day(3)),
            status: BorrowStatus::Returned,
        };

        let err = change_status(&mut record, &mut b, BorrowStatus::Borrowed, day(4)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(record.status, BorrowStatus::Returned);
        assert_eq!(b.available_copies, 0);

        let mut b = book(1, 1);
        assert!(change_status(&mut record, &mut b, BorrowStatus::Borrowed, day(4)).unwrap());
        assert_eq!(b.available_copies, 0);
        assert_eq!(record.return_date, None);
        assert_eq!(record.status, BorrowStatus::Borrowed);
    }

    #[test]
    fn test_same_status_is_inventory_noop() {
        let mut b = book(2, 1);
        let mut record = BorrowRecord {
            id: 1,
            user_id: 1,
            book_id: 7,
            borrow_date: day(1),
            due_date: day(15),
            return_date: None,
            status: BorrowStatus::Borrowed,
        };

        assert!(!change_status(&mut record, &mut b, BorrowStatus::Borrowed, day(2)).unwrap());
        assert_eq!(b.available_copies, 1);
        assert_eq!(record.return_date, None);
    }

    #[test]
    fn test_record_update_applies_due_date_independently() {
        let mut b = book(2, 1);
        let mut record = BorrowRecord {
            id: 1,
            user_id: 1,
            book_id: 7,
            borrow_date: day(1),
            due_date: day(15),
            return_date: None,
            status: BorrowStatus::Borrowed,
        };

        let update = UpdateBorrowRecord {
            status: None,
            due_date: Some(day(28)),
        };
        apply_record_update(&mut record, &mut b, &update, day(2)).unwrap();
        assert_eq!(record.due_date, day(28));
        assert_eq!(b.available_copies, 1);

        let update = UpdateBorrowRecord {
            status: Some(BorrowStatus::Returned),
            due_date: Some(day(20)),
        };
        apply_record_update(&mut record, &mut b, &update, day(3)).unwrap();
        assert_eq!(record.status, BorrowStatus::Returned);
        assert_eq!(record.due_date, day(20));
        assert_eq!(b.available_copies, 2);
    }

    #[test]
    fn test_release_never_overstocks() {
        let mut b = book(1, 1);
        let mut record = BorrowRecord {
            id: 1,
            user_id: 1,
            book_id: 7,
            borrow_date: day(1),
            due_date: day(15),
            return_date: None,
            status: BorrowStatus::Borrowed,
        };

        let err = check_in(&mut record, &mut b, day(2)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(b.available_copies, 1);
        assert_eq!(record.status, BorrowStatus::Borrowed);
    }

    #[test]
    fn test_resize_below_loans_rejected() {
        let mut b = book(5, 3);
        let err = resize(&mut b, 1).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(b.total_copies, 5);
        assert_eq!(b.available_copies, 3);
    }

    #[test]
    fn test_resize_keeps_loans_outstanding() {
        let mut b = book(5, 3);
        resize(&mut b, 2).unwrap();
        assert_eq!((b.total_copies, b.available_copies), (2, 0));

        resize(&mut b, 10).unwrap();
        assert_eq!((b.total_copies, b.available_copies), (10, 8));
    }

    #[test]
    fn test_invariant_holds_across_mixed_sequence() {
        let policy = BorrowPolicy::default();
        let mut b = book(3, 3);
        let mut records = Vec::new();

        for user in 1..=3 {
            let new = policy.checkout(user, 0, &mut b, day(1)).unwrap();
            records.push(record_from(new, user));
            assert_shelf_invariant(&b);
        }
        assert!(policy.checkout(4, 0, &mut b, day(1)).is_err());

        check_in(&mut records[0], &mut b, day(2)).unwrap();
        assert_shelf_invariant(&b);

        assert!(resize(&mut b, 1).is_err());
        resize(&mut b, 2).unwrap();
        assert_shelf_invariant(&b);
        assert_eq!(b.available_copies, 0);

        assert!(change_status(&mut records[0], &mut b, BorrowStatus::Borrowed, day(3)).is_err());
        change_status(&mut records[1], &mut b, BorrowStatus::Returned, day(3)).unwrap();
        assert_shelf_invariant(&b);
        change_status(&mut records[0], &mut b, BorrowStatus::Borrowed, day(3)).unwrap();
        assert_shelf_invariant(&b);

        for record in records.iter_mut() {
            let _ = change_status(record, &mut b, BorrowStatus::Returned, day(4));
            assert_shelf_invariant(&b);
        }
        assert_eq!(b.available_copies, b.total_copies);
        assert!(records
            .iter()
            .all(|r| r.status == BorrowStatus::Returned && r.return_date.is_some()));
    }
}
