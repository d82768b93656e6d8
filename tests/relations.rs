use pawpicsd::{core::*, relation::*, test::*};


#[ctor::ctor]
fn initialize() { env_logger::init(); }

async fn assert_consistent(service: &RelationService, target: TargetId, kind: RelationKind) -> i64 {
	let counter = service
		.counter(target, kind)
		.await
		.unwrap()
		.expect("target missing");
	let rows = service.count_relations(target, kind).await.unwrap();
	assert_eq!(counter, rows as i64, "counter drifted from the relation rows");
	counter
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_relation_toggled_concurrently() {
	let db = load_database("concurrent-same").await;
	create_user(&db, 1, "rex").await;
	create_post(&db, 1, 1).await;
	let service = RelationService::new(db);

	let mut handles = Vec::new();
	for _ in 0..10 {
		let service = service.clone();
		handles.push(tokio::spawn(async move {
			service
				.toggle(ActorId(1), TargetId(1), RelationKind::Like)
				.await
				.unwrap()
		}));
	}
	let mut results = Vec::new();
	for handle in handles {
		results.push(handle.await.unwrap());
	}

	// Every toggle saw the one before it, so they alternated
	let activations = results.iter().filter(|r| r.active).count();
	assert_eq!(activations, 5);
	for result in &results {
		assert_eq!(result.counter, if result.active { 1 } else { 0 });
	}
	assert_eq!(
		assert_consistent(&service, TargetId(1), RelationKind::Like).await,
		0
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_actors_concurrently() {
	let db = load_database("concurrent-many").await;
	for id in 1..=8 {
		create_user(&db, id, &format!("pet{}", id)).await;
	}
	create_post(&db, 1, 1).await;
	let service = RelationService::new(db);

	let mut handles = Vec::new();
	for actor in 1..=8 {
		let service = service.clone();
		handles.push(tokio::spawn(async move {
			let like = service
				.toggle(ActorId(actor), TargetId(1), RelationKind::Like)
				.await
				.unwrap();
			assert!(like.active);
			if actor != 1 {
				let follow = service
					.toggle(ActorId(actor), TargetId(1), RelationKind::Follow)
					.await
					.unwrap();
				assert!(follow.active);
			}
		}));
	}
	for handle in handles {
		handle.await.unwrap();
	}

	assert_eq!(
		assert_consistent(&service, TargetId(1), RelationKind::Like).await,
		8
	);
	assert_eq!(
		assert_consistent(&service, TargetId(1), RelationKind::Follow).await,
		7
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_like_twice_while_another_likes() {
	let db = load_database("concurrent-end-to-end").await;
	create_user(&db, 5, "rex").await;
	create_user(&db, 6, "whiskers").await;
	create_post(&db, 42, 5).await;
	let service = RelationService::new(db);

	let service2 = service.clone();
	let twice = tokio::spawn(async move {
		let first = service2
			.toggle(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap();
		let second = service2
			.toggle(ActorId(5), TargetId(42), RelationKind::Like)
			.await
			.unwrap();
		(first, second)
	});
	let service3 = service.clone();
	let once = tokio::spawn(async move {
		service3
			.toggle(ActorId(6), TargetId(42), RelationKind::Like)
			.await
			.unwrap()
	});

	let (first, second) = twice.await.unwrap();
	let other = once.await.unwrap();
	assert!(first.active);
	assert!(!second.active);
	assert!(other.active);

	assert_eq!(
		assert_consistent(&service, TargetId(42), RelationKind::Like).await,
		1
	);
	assert!(service
		.is_active(ActorId(6), TargetId(42), RelationKind::Like)
		.await
		.unwrap());
	assert!(!service
		.is_active(ActorId(5), TargetId(42), RelationKind::Like)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_rejected_toggles_leave_nothing_behind() {
	let db = load_database("rejected-toggles").await;
	create_user(&db, 1, "rex").await;
	let service = RelationService::new(db);

	assert!(matches!(
		service
			.toggle(ActorId(1), TargetId(1), RelationKind::Follow)
			.await,
		Err(Error::SelfRelation(_))
	));
	assert!(matches!(
		service
			.toggle(ActorId(1), TargetId(2), RelationKind::Follow)
			.await,
		Err(Error::TargetNotFound(..))
	));
	assert!(matches!(
		service
			.toggle(ActorId(1), TargetId(3), RelationKind::Like)
			.await,
		Err(Error::TargetNotFound(..))
	));

	assert_eq!(
		assert_consistent(&service, TargetId(1), RelationKind::Follow).await,
		0
	);
	assert_eq!(
		service
			.count_relations(TargetId(2), RelationKind::Follow)
			.await
			.unwrap(),
		0
	);
	assert_eq!(
		service
			.count_relations(TargetId(3), RelationKind::Like)
			.await
			.unwrap(),
		0
	);
}
