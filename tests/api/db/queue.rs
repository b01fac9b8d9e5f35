use chrono::{Duration, Utc};
use nexa_crawler::{
    db::{PgStore, queue::PgJobQueue},
    model::JobPayload,
    queue::{JobQueue, RetryPolicy},
    repository::JobRepository,
};
use sqlx::PgPool;

async fn queued(pool: &PgPool, slug: &str) -> (PgJobQueue, JobPayload) {
    let store = PgStore::new(pool.clone());
    let job = store
        .create_job(&format!("https://reapertrans.com/manga/{}/", slug), "reapertrans")
        .await
        .unwrap();
    let payload = JobPayload::from(&job);
    let queue = PgJobQueue::new(pool.clone(), RetryPolicy::default());
    queue.enqueue(&payload).await.unwrap();

    (queue, payload)
}

async fn rows(pool: &PgPool) -> Vec<(String, i32)> {
    sqlx::query_as("SELECT status, attempts FROM job_queue ORDER BY id")
        .fetch_all(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn delivery_is_claimed_once(pool: PgPool) {
    let (queue, payload) = queued(&pool, "solo-leveling").await;

    let delivery = queue.dequeue().await.unwrap().unwrap();

    assert_eq!(delivery.payload, payload);
    assert_eq!(delivery.attempts, 1);
    assert_eq!(delivery.max_attempts, 3);
    assert!(queue.dequeue().await.unwrap().is_none());
    assert_eq!(rows(&pool).await, vec![("active".to_string(), 1)]);
}

#[sqlx::test(migrations = "./migrations")]
async fn completed_delivery_leaves_the_table(pool: PgPool) {
    let (queue, _) = queued(&pool, "solo-leveling").await;
    let delivery = queue.dequeue().await.unwrap().unwrap();

    queue.complete(&delivery).await.unwrap();

    assert!(rows(&pool).await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn retried_delivery_waits_for_its_backoff(pool: PgPool) {
    let (queue, _) = queued(&pool, "solo-leveling").await;
    let delivery = queue.dequeue().await.unwrap().unwrap();

    queue
        .retry(&delivery, Utc::now() + Duration::hours(1), "timeout")
        .await
        .unwrap();
    assert!(queue.dequeue().await.unwrap().is_none());

    queue
        .retry(&delivery, Utc::now() - Duration::seconds(1), "timeout")
        .await
        .unwrap();
    let again = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(again.id, delivery.id);
    assert_eq!(again.attempts, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn stalled_delivery_is_put_back_in_line(pool: PgPool) {
    let (queue, _) = queued(&pool, "solo-leveling").await;
    queue.dequeue().await.unwrap().unwrap();

    let requeued = queue.requeue_stalled().await.unwrap();

    assert_eq!(requeued, 1);
    assert_eq!(rows(&pool).await, vec![("waiting".to_string(), 1)]);
    let again = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(again.attempts, 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn only_old_dead_deliveries_are_pruned(pool: PgPool) {
    let (queue, _) = queued(&pool, "solo-leveling").await;
    let delivery = queue.dequeue().await.unwrap().unwrap();
    queue.bury(&delivery, "navigation failed").await.unwrap();
    let (_, waiting) = queued(&pool, "the-boxer").await;

    let pruned = queue
        .prune_dead(Utc::now() - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(pruned, 0);
    assert_eq!(rows(&pool).await.len(), 2);

    let pruned = queue
        .prune_dead(Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(pruned, 1);
    assert_eq!(rows(&pool).await, vec![("waiting".to_string(), 0)]);

    let remaining = queue.dequeue().await.unwrap().unwrap();
    assert_eq!(remaining.payload, waiting);
}

#[sqlx::test(migrations = "./migrations")]
async fn removing_a_job_removes_its_deliveries(pool: PgPool) {
    let (_, payload) = queued(&pool, "solo-leveling").await;

    sqlx::query("DELETE FROM jobs WHERE id = $1")
        .bind(payload.job_id)
        .execute(&pool)
        .await
        .unwrap();

    assert!(rows(&pool).await.is_empty());
}
