use std::sync::Arc;
use std::time::Duration;

use arrow_schema::DataType;
use assert_unordered::assert_eq_unordered_sort;
use remote_catalog::catalog::memory::{MemoryMetaClient, MetaOp};
use remote_catalog::catalog::{
    CatalogOptions, CatalogResult, ColumnDesc, CreateTableInfo, PropagationDelay,
    RemoteCatalog, TableName,
};

// Several frontends sharing one metadata service, each with its own heartbeat
async fn make_frontends(
    meta: &Arc<MemoryMetaClient>,
    count: usize,
) -> CatalogResult<Vec<Arc<RemoteCatalog>>> {
    let interval = Duration::from_millis(2000);
    let mut frontends = vec![];

    for i in 0..count {
        let options = CatalogOptions {
            heartbeat_interval: interval,
            propagation_delay: PropagationDelay::from_heartbeat(
                interval,
                PropagationDelay::DEFAULT_MULTIPLIER,
            ),
            node_id: format!("frontend-{i}"),
        };
        frontends.push(RemoteCatalog::try_new(meta.clone(), options).await?);
    }

    Ok(frontends)
}

fn table_info(name: &str) -> CreateTableInfo {
    CreateTableInfo::builder(name)
        .add_column("id", ColumnDesc::new(DataType::Int64).primary())
        .add_column("name", ColumnDesc::new(DataType::Utf8))
        .build()
}

#[tokio::test(start_paused = true)]
async fn test_mutations_reach_other_frontends() -> Result<(), Box<dyn std::error::Error>> {
    let meta = Arc::new(MemoryMetaClient::new());
    let frontends = make_frontends(&meta, 2).await?;
    let (a, b) = (&frontends[0], &frontends[1]);
    let heartbeats = vec![a.start_heartbeat(), b.start_heartbeat()];

    // Each mutation only returns once the other frontend had a heartbeat
    a.create_database(&"db1".parse()?, "public").await?;
    assert!(b.get_schema(&"db1.public".parse()?).is_some());

    a.create_table(&"db1.public".parse()?, &table_info("t1"))
        .await?;
    b.create_table(&"db1.public".parse()?, &table_info("t2"))
        .await?;

    let t1: TableName = "db1.public.t1".parse()?;
    for frontend in [a, b] {
        let schema = frontend.get_schema(&"db1.public".parse()?).unwrap();
        assert_eq_unordered_sort!(
            schema.table_names(),
            vec!["t2".to_string(), "t1".to_string()]
        );
        assert_eq!(frontend.get_table(&t1).unwrap().primary_key_column_ids(), &[0]);
    }

    b.drop_table(&t1).await?;
    assert!(a.get_table(&t1).is_none());

    // Both replicas converged on the same catalog
    assert_eq!(a.snapshot()?, b.snapshot()?);
    assert_eq!(a.snapshot()?, meta.catalog());

    for heartbeat in heartbeats {
        assert_eq!(heartbeat.restarts(), 0);
        heartbeat.shutdown().await;
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_frontend_recovers_from_metadata_outage() -> Result<(), Box<dyn std::error::Error>>
{
    let meta = Arc::new(MemoryMetaClient::new());
    let frontends = make_frontends(&meta, 2).await?;
    let (a, b) = (&frontends[0], &frontends[1]);
    let heartbeat = b.start_heartbeat();

    // b misses a couple of heartbeats while a makes changes
    meta.fail_next(MetaOp::Heartbeat, 2);
    a.create_database(&"db1".parse()?, "public").await?;
    a.create_table(&"db1.public".parse()?, &table_info("t1"))
        .await?;

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(heartbeat.restarts(), 2);
    assert!(b.get_table(&"db1.public.t1".parse()?).is_some());
    assert_eq!(a.snapshot()?, b.snapshot()?);

    heartbeat.shutdown().await;
    Ok(())
}
