//! Integration tests for wave-gated statement execution

mod common;

use common::{users, MockDatabase};
use futures::stream::{self, StreamExt};
use std::sync::Mutex;
use std::time::Duration;
use veil::core::planner::Statement;
use veil::core::scheduler::Scheduler;
use veil::domain::VeilError;

fn update(index: u64) -> Statement {
    Statement::raw(format!("UPDATE `users` SET `email` = 'x' WHERE `id` = {index}"))
}

#[tokio::test]
async fn test_statements_run_while_cursor_is_read() {
    let db = MockDatabase::new("shop");
    // Completed writes observed each time the cursor yields a row
    let observed = Mutex::new(Vec::new());

    let (db_ref, observed_ref) = (&db, &observed);
    let rows = stream::iter(users(3))
        .then(move |row| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            observed_ref.lock().unwrap().push(db_ref.writes().len());
            Ok::<_, VeilError>(row)
        })
        .boxed();

    let stats = Scheduler::new(10)
        .run("users", rows, &db, |_, index| Ok(Some(update(index))))
        .await
        .unwrap();

    assert_eq!(stats.statements, 3);
    assert_eq!(stats.waves, 1);
    assert_eq!(*observed.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_wave_completes_before_next_row_is_read() {
    let db = MockDatabase::new("shop");
    let observed = Mutex::new(Vec::new());

    let (db_ref, observed_ref) = (&db, &observed);
    let rows = stream::iter(users(5))
        .then(move |row| async move {
            observed_ref.lock().unwrap().push(db_ref.writes().len());
            Ok::<_, VeilError>(row)
        })
        .boxed();

    let stats = Scheduler::new(2)
        .run("users", rows, &db, |_, index| Ok(Some(update(index))))
        .await
        .unwrap();

    assert_eq!(stats.waves, 3);
    // Rows 3 and 5 are only read once the previous wave fully completed
    let observed = observed.lock().unwrap();
    assert_eq!(observed[2], 2);
    assert_eq!(observed[4], 4);
    assert!(db.peak_in_flight() <= 2);
}
