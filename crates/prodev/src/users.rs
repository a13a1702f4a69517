//! Read-side access to `user_data`.
//!
//! Most of this is lazy: rows are pulled from the server as the returned
//! streams are polled, one row or one page at a time.

use futures::{Stream, TryStreamExt, stream};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use crate::config::DbConfig;
use crate::database::{close_quietly, connect_to_prodev, log_statement};
use crate::errors::ProdevError;
use crate::models::UserRecord;

const SELECT_USERS: &str = "SELECT user_id, name, email, age FROM user_data ORDER BY user_id";

const SELECT_PAGE: &str = r#"
    SELECT user_id, name, email, age
    FROM user_data
    ORDER BY user_id
    LIMIT $1 OFFSET $2
"#;

const SELECT_BY_NAME: &str = "SELECT user_id, name, email, age FROM user_data ORDER BY name";

const SELECT_OLDER_THAN: &str = r#"
    SELECT user_id, name, email, age
    FROM user_data
    WHERE age > $1
    ORDER BY age DESC
"#;

const SELECT_AGES: &str = "SELECT age FROM user_data";

const COUNT_USERS: &str = "SELECT COUNT(*) FROM user_data";

/// Streams every user, ordered by `user_id`.
pub fn stream_users(
    conn: &mut PgConnection,
) -> impl Stream<Item = Result<UserRecord, ProdevError>> + '_ {
    log_statement(SELECT_USERS);
    sqlx::query_as::<_, UserRecord>(SELECT_USERS)
        .fetch(conn)
        .map_err(ProdevError::from)
}

/// Fetches one page of users.
pub async fn paginate_users(
    conn: &mut PgConnection,
    page_size: usize,
    offset: usize,
) -> Result<Vec<UserRecord>, ProdevError> {
    let (limit, offset) = page_bounds(page_size, offset)?;

    log_statement(SELECT_PAGE);
    let users = sqlx::query_as::<_, UserRecord>(SELECT_PAGE)
        .bind(limit)
        .bind(offset)
        .fetch_all(conn)
        .await?;

    Ok(users)
}

/// Converts page bounds to the `BIGINT`s `LIMIT`/`OFFSET` take.
fn page_bounds(page_size: usize, offset: usize) -> Result<(i64, i64), ProdevError> {
    let out_of_range = |_| ProdevError::PageOutOfRange { page_size, offset };
    let limit = i64::try_from(page_size).map_err(out_of_range)?;
    let offset = i64::try_from(offset).map_err(out_of_range)?;
    Ok((limit, offset))
}

/// Streams users in pages of `batch_size`.
///
/// Ends after the first empty or short page. A `batch_size` of zero is treated as one.
pub fn stream_users_in_batches(
    conn: &mut PgConnection,
    batch_size: usize,
) -> impl Stream<Item = Result<Vec<UserRecord>, ProdevError>> + '_ {
    let page_size = batch_size.max(1);

    stream::try_unfold((conn, Some(0)), move |(conn, offset)| async move {
        let Some(offset) = offset else {
            return Ok::<_, ProdevError>(None);
        };

        let page = paginate_users(&mut *conn, page_size, offset).await?;
        if page.is_empty() {
            return Ok(None);
        }

        let next = (page.len() == page_size).then_some(offset + page.len());
        Ok(Some((page, (conn, next))))
    })
}

/// Streams users older than `min_age`, reading the table batch by batch.
pub fn batch_processing(
    conn: &mut PgConnection,
    batch_size: usize,
    min_age: Decimal,
) -> impl Stream<Item = Result<UserRecord, ProdevError>> + '_ {
    stream_users_in_batches(conn, batch_size)
        .map_ok(move |batch| {
            let older: Vec<Result<UserRecord, ProdevError>> = batch
                .into_iter()
                .filter(|user| user.age > min_age)
                .map(Ok)
                .collect();
            stream::iter(older)
        })
        .try_flatten()
}

/// All users, ordered by name.
pub async fn fetch_all_users(conn: &mut PgConnection) -> Result<Vec<UserRecord>, ProdevError> {
    log_statement(SELECT_BY_NAME);
    let users = sqlx::query_as::<_, UserRecord>(SELECT_BY_NAME)
        .fetch_all(conn)
        .await?;
    Ok(users)
}

/// Users strictly older than `min_age`, oldest first.
pub async fn fetch_users_older_than(
    conn: &mut PgConnection,
    min_age: Decimal,
) -> Result<Vec<UserRecord>, ProdevError> {
    log_statement(SELECT_OLDER_THAN);
    let users = sqlx::query_as::<_, UserRecord>(SELECT_OLDER_THAN)
        .bind(min_age)
        .fetch_all(conn)
        .await?;
    Ok(users)
}

/// Runs [`fetch_all_users`] and [`fetch_users_older_than`] at the same time, each on
/// its own connection. Both connections are closed before returning.
pub async fn fetch_concurrently(
    config: &DbConfig,
    min_age: Decimal,
) -> Result<(Vec<UserRecord>, Vec<UserRecord>), ProdevError> {
    let mut all_conn = connect_to_prodev(config).await?;
    let mut older_conn = match connect_to_prodev(config).await {
        Ok(conn) => conn,
        Err(e) => {
            close_quietly(all_conn).await;
            return Err(e);
        }
    };

    let result = tokio::try_join!(
        fetch_all_users(&mut all_conn),
        fetch_users_older_than(&mut older_conn, min_age)
    );

    close_quietly(all_conn).await;
    close_quietly(older_conn).await;
    result
}

/// Streams the age of every user.
pub fn stream_user_ages(
    conn: &mut PgConnection,
) -> impl Stream<Item = Result<Decimal, ProdevError>> + '_ {
    log_statement(SELECT_AGES);
    sqlx::query_scalar::<_, Decimal>(SELECT_AGES)
        .fetch(conn)
        .map_err(ProdevError::from)
}

/// Mean age over all users without loading them all at once. Zero for an empty table.
pub async fn compute_average_age(conn: &mut PgConnection) -> Result<Decimal, ProdevError> {
    let (total, count) = stream_user_ages(conn)
        .try_fold((Decimal::ZERO, 0u64), |(total, count), age| async move {
            Ok((total + age, count + 1))
        })
        .await?;

    Ok(average(total, count))
}

fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count)
    }
}

pub async fn count_users(conn: &mut PgConnection) -> Result<i64, ProdevError> {
    log_statement(COUNT_USERS);
    let count = sqlx::query_scalar(COUNT_USERS).fetch_one(conn).await?;
    Ok(count)
}
