//! Borrow ledger tests against a real database

use bookaholic_server::{
    error::AppError,
    inventory::BorrowPolicy,
    models::{
        book::{Book, BookUpdate, NewBook},
        borrow::UpdateBorrowRecord,
        enums::{AuthProvider, BorrowStatus, Role},
        user::{NewUser, UserClaims},
    },
    repository::Repository,
    services::borrows::BorrowService,
};
use sqlx::PgPool;

async fn member(repository: &Repository, email: &str) -> Result<UserClaims, anyhow::Error> {
    let user = repository
        .users
        .create(&NewUser {
            email: email.to_string(),
            full_name: "Test Member".to_string(),
            password: None,
            role: Role::User,
            auth_provider: AuthProvider::Local,
            is_verified: true,
            otp_code: None,
            otp_expiry: None,
        })
        .await?;
    Ok(UserClaims::new(&user, 1))
}

async fn book(repository: &Repository, isbn: &str, copies: i32) -> Result<Book, anyhow::Error> {
    let book = repository
        .books
        .create(
            &NewBook {
                title: format!("Book {}", isbn),
                author: "Test Author".to_string(),
                isbn: isbn.to_string(),
                copies,
            },
            None,
        )
        .await?;
    Ok(book)
}

fn service(pool: &PgPool) -> (Repository, BorrowService) {
    let repository = Repository::new(pool.clone());
    let service = BorrowService::new(repository.clone(), BorrowPolicy::default());
    (repository, service)
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_last_copy_cannot_be_borrowed_twice(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let bob = member(&repository, "bob@example.com").await?;
    let carol = member(&repository, "carol@example.com").await?;
    let book = book(&repository, "0441172717", 2).await?;

    let first = borrows.borrow(&alice, book.id).await?;
    assert_eq!(first.status, BorrowStatus::Borrowed);
    assert_eq!(first.user_email, "alice@example.com");
    assert_eq!(first.book_title, book.title);
    assert_eq!(first.due_date, first.borrow_date + chrono::Duration::days(14));
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 1);

    borrows.borrow(&bob, book.id).await?;
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 0);

    let err = borrows.borrow(&carol, book.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 0);
    assert_eq!(repository.borrows.count().await?, 2);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_borrow_limit_applies_before_availability(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;

    for isbn in ["0000000001", "0000000002", "0000000003"] {
        let b = book(&repository, isbn, 1).await?;
        borrows.borrow(&alice, b.id).await?;
    }

    let fourth = book(&repository, "0000000004", 5).await?;
    let err = borrows.borrow(&alice, fourth.id).await.unwrap_err();
    assert!(matches!(err, AppError::LimitExceeded(_)));
    assert!(err.to_string().contains("maximum borrowing limit of 3"));
    assert_eq!(repository.books.get_by_id(fourth.id).await?.available_copies, 5);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_return_is_not_repeatable(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let book = book(&repository, "0441172717", 1).await?;

    let record = borrows.borrow(&alice, book.id).await?;
    let returned = borrows.return_book(&alice, record.id).await?;
    assert_eq!(returned.status, BorrowStatus::Returned);
    assert!(returned.return_date.is_some());
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 1);

    let err = borrows.return_book(&alice, record.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 1);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_members_return_only_their_own_records(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let mallory = member(&repository, "mallory@example.com").await?;
    let book = book(&repository, "0441172717", 1).await?;

    let record = borrows.borrow(&alice, book.id).await?;
    let err = borrows.return_book(&mallory, record.id).await.unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
    assert_eq!(
        repository.borrows.get_by_id(record.id).await?.status,
        BorrowStatus::Borrowed
    );
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 0);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_resize_keeps_loans_outstanding(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let bob = member(&repository, "bob@example.com").await?;
    let book = book(&repository, "0441172717", 5).await?;

    borrows.borrow(&alice, book.id).await?;
    borrows.borrow(&bob, book.id).await?;

    let mut update = BookUpdate {
        title: book.title.clone(),
        author: book.author.clone(),
        isbn: book.isbn.clone(),
        total_copies: 1,
    };
    let err = repository.books.update(book.id, &update, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    update.total_copies = 2;
    let resized = repository.books.update(book.id, &update, None).await?;
    assert_eq!(resized.total_copies, 2);
    assert_eq!(resized.available_copies, 0);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_admin_update_needs_a_free_copy_to_reopen(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let bob = member(&repository, "bob@example.com").await?;
    let book = book(&repository, "0441172717", 1).await?;

    let first = borrows.borrow(&alice, book.id).await?;
    let returned = borrows.return_book(&alice, first.id).await?;
    borrows.borrow(&bob, book.id).await?;

    let reopen = UpdateBorrowRecord {
        status: Some(BorrowStatus::Borrowed),
        due_date: Some(returned.due_date + chrono::Duration::days(30)),
    };
    let err = borrows.update_record(first.id, reopen).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // Nothing from the rejected edit reaches the database
    let record = repository.borrows.get_by_id(first.id).await?;
    assert_eq!(record.status, BorrowStatus::Returned);
    assert_eq!(record.return_date, returned.return_date);
    assert!(record.return_date.is_some());
    assert_eq!(record.due_date, returned.due_date);

    let shelf = repository.books.get_by_id(book.id).await?;
    assert_eq!(shelf.available_copies, 0);
    assert_eq!(shelf.total_copies, 1);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_override_reconciles_inventory_both_ways(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let book = book(&repository, "0441172717", 2).await?;

    let record = borrows.borrow(&alice, book.id).await?;

    let returned = borrows.override_status(record.id, BorrowStatus::Returned).await?;
    assert!(returned.return_date.is_some());
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 2);

    // Same status again leaves the shelf alone
    borrows.override_status(record.id, BorrowStatus::Returned).await?;
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 2);

    let reopened = borrows.override_status(record.id, BorrowStatus::Borrowed).await?;
    assert!(reopened.return_date.is_none());
    assert_eq!(repository.books.get_by_id(book.id).await?.available_copies, 1);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_borrows_of_last_copy(pool: PgPool) -> Result<(), anyhow::Error> {
    let (repository, borrows) = service(&pool);
    let book = book(&repository, "0441172717", 1).await?;
    let book_id = book.id;

    let mut tasks = Vec::new();
    for i in 0..4 {
        let claims = member(&repository, &format!("reader{}@example.com", i)).await?;
        let borrows = borrows.clone();
        tasks.push(tokio::spawn(async move {
            borrows.borrow(&claims, book_id).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => successes += 1,
            Err(AppError::Unavailable(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    assert_eq!(successes, 1);
    let after = repository.books.get_by_id(book_id).await?;
    assert_eq!(after.available_copies, 0);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_history_is_paged_per_user(pool: PgPool) -> Result<(), anyhow::Error> {
    use bookaholic_server::models::page::PageRequest;

    let (repository, borrows) = service(&pool);
    let alice = member(&repository, "alice@example.com").await?;
    let bob = member(&repository, "bob@example.com").await?;

    for isbn in ["0000000001", "0000000002", "0000000003"] {
        let b = book(&repository, isbn, 1).await?;
        borrows.borrow(&alice, b.id).await?;
    }
    let other = book(&repository, "0000000004", 1).await?;
    borrows.borrow(&bob, other.id).await?;

    let page = borrows
        .my_history(&alice, PageRequest::new(Some(0), Some(2))?, None)
        .await?;
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.content.len(), 2);
    assert!(page.has_next);
    assert!(page.content.iter().all(|r| r.user_id == alice.user_id));

    let returned = borrows
        .my_history(&alice, PageRequest::new(None, None)?, Some(BorrowStatus::Returned))
        .await?;
    assert_eq!(returned.total_elements, 0);

    let all = borrows.all_records(PageRequest::new(None, None)?, None).await?;
    assert_eq!(all.total_elements, 4);

    Ok(())
}
