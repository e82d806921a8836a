//! Integration tests for store-scoped tags and their item links.

#![allow(clippy::unwrap_used)]

use storekeep_api::services::TagError;
use storekeep_core::{ItemId, StoreId, TagId};
use storekeep_integration_tests::TestContext;

#[tokio::test]
async fn test_tag_names_are_unique_per_store() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let first = ctx.store(&principal, "First").await;
    let second = ctx.store(&principal, "Second").await;
    let tags = ctx.state.tags();

    tags.create_tag(&principal, first.id, "sale").await.unwrap();
    assert!(matches!(
        tags.create_tag(&principal, first.id, "sale").await,
        Err(TagError::DuplicateName)
    ));

    // Same name in another store is fine
    let other = tags.create_tag(&principal, second.id, "sale").await.unwrap();
    assert_eq!(other.store_id, second.id);

    assert_eq!(tags.list_tags(&principal, first.id).await.unwrap().len(), 1);
    assert_eq!(tags.list_all_tags(&principal).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_create_tag_yields_one_winner() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;
    let tags = ctx.state.tags();

    let (a, b) = tokio::join!(
        tags.create_tag(&principal, store.id, "sale"),
        tags.create_tag(&principal, store.id, "sale"),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(TagError::DuplicateName)))
    );
    assert_eq!(tags.list_tags(&principal, store.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_tag_on_file_database() {
    let ctx = TestContext::on_disk().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;

    for round in 0..20 {
        let name = format!("t{round}");
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = ctx.state.clone();
                let principal = principal.clone();
                let name = name.clone();
                tokio::spawn(async move {
                    state.tags().create_tag(&principal, store.id, &name).await
                })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(TagError::DuplicateName) => duplicates += 1,
                Err(other) => panic!("round {round}: unexpected error {other:?}"),
            }
        }
        assert_eq!((created, duplicates), (1, 3), "round {round}");
    }

    assert_eq!(
        ctx.state
            .tags()
            .list_tags(&principal, store.id)
            .await
            .unwrap()
            .len(),
        20
    );
}

#[tokio::test]
async fn test_create_tag_in_missing_store() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;

    assert!(matches!(
        ctx.state
            .tags()
            .create_tag(&principal, StoreId::new(77), "sale")
            .await,
        Err(TagError::StoreNotFound)
    ));
    assert!(matches!(
        ctx.state.tags().list_tags(&principal, StoreId::new(77)).await,
        Err(TagError::StoreNotFound)
    ));
}

#[tokio::test]
async fn test_link_and_unlink() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;
    let item = ctx.item(&principal, store.id, "Chair").await;
    let tags = ctx.state.tags();
    let tag = tags.create_tag(&principal, store.id, "sale").await.unwrap();

    let linked = tags
        .link_tag_to_item(&principal, item.id, tag.id)
        .await
        .unwrap();
    assert_eq!(linked, tag);
    // Linking twice is a no-op
    tags.link_tag_to_item(&principal, item.id, tag.id)
        .await
        .unwrap();

    let detail = tags.get_tag(&principal, tag.id).await.unwrap();
    assert_eq!(detail.items, vec![item.clone()]);
    let item_detail = ctx.state.catalog().get_item(item.id).await.unwrap();
    assert_eq!(item_detail.tags, vec![tag.clone()]);

    let (unlinked_item, unlinked_tag) = tags
        .unlink_tag_from_item(&principal, item.id, tag.id)
        .await
        .unwrap();
    assert_eq!(unlinked_item, item);
    assert_eq!(unlinked_tag, tag);
    assert!(tags.get_tag(&principal, tag.id).await.unwrap().items.is_empty());

    // Unlinking an absent link is a no-op
    tags.unlink_tag_from_item(&principal, item.id, tag.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_link_across_stores_is_rejected() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let first = ctx.store(&principal, "First").await;
    let second = ctx.store(&principal, "Second").await;
    let item = ctx.item(&principal, first.id, "Chair").await;
    let tag = ctx
        .state
        .tags()
        .create_tag(&principal, second.id, "sale")
        .await
        .unwrap();

    assert!(matches!(
        ctx.state
            .tags()
            .link_tag_to_item(&principal, item.id, tag.id)
            .await,
        Err(TagError::StoreMismatch)
    ));
}

#[tokio::test]
async fn test_link_missing_side() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;
    let item = ctx.item(&principal, store.id, "Chair").await;
    let tags = ctx.state.tags();
    let tag = tags.create_tag(&principal, store.id, "sale").await.unwrap();

    assert!(matches!(
        tags.link_tag_to_item(&principal, ItemId::new(999), tag.id)
            .await,
        Err(TagError::ItemNotFound)
    ));
    assert!(matches!(
        tags.link_tag_to_item(&principal, item.id, TagId::new(999))
            .await,
        Err(TagError::TagNotFound)
    ));
    assert!(matches!(
        tags.unlink_tag_from_item(&principal, item.id, TagId::new(999))
            .await,
        Err(TagError::TagNotFound)
    ));
}

#[tokio::test]
async fn test_delete_tag_blocked_while_linked() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;
    let item = ctx.item(&principal, store.id, "Chair").await;
    let tags = ctx.state.tags();
    let tag = tags.create_tag(&principal, store.id, "sale").await.unwrap();

    tags.link_tag_to_item(&principal, item.id, tag.id)
        .await
        .unwrap();
    assert!(matches!(
        tags.delete_tag(&principal, tag.id).await,
        Err(TagError::InUse)
    ));
    // Still there, still linked
    assert_eq!(
        tags.get_tag(&principal, tag.id).await.unwrap().items.len(),
        1
    );

    tags.unlink_tag_from_item(&principal, item.id, tag.id)
        .await
        .unwrap();
    tags.delete_tag(&principal, tag.id).await.unwrap();

    assert!(matches!(
        tags.get_tag(&principal, tag.id).await,
        Err(TagError::TagNotFound)
    ));
    assert!(matches!(
        tags.delete_tag(&principal, tag.id).await,
        Err(TagError::TagNotFound)
    ));
}

#[tokio::test]
async fn test_deleting_item_drops_links() {
    let ctx = TestContext::new().await;
    let (_, principal, _) = ctx.signed_in("alice").await;
    let store = ctx.store(&principal, "Store").await;
    let item = ctx.item(&principal, store.id, "Chair").await;
    let tags = ctx.state.tags();
    let tag = tags.create_tag(&principal, store.id, "sale").await.unwrap();
    tags.link_tag_to_item(&principal, item.id, tag.id)
        .await
        .unwrap();

    ctx.state
        .catalog()
        .delete_item(&principal, item.id)
        .await
        .unwrap();

    assert!(tags.get_tag(&principal, tag.id).await.unwrap().items.is_empty());
    tags.delete_tag(&principal, tag.id).await.unwrap();
}
