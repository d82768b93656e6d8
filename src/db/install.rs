/// The schema of a fresh database, at version v0.0. Everything after that is
/// applied by the migrations.
pub const QUERY: &'static str = r#"
	CREATE TABLE version (
		major INTEGER NOT NULL,
		minor INTEGER NOT NULL
	);
	INSERT INTO version VALUES (0, 0);

	CREATE TABLE users (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		email TEXT NOT NULL,
		username TEXT NOT NULL,
		password TEXT NOT NULL,
		name TEXT,
		description TEXT,
		image TEXT,
		location TEXT,
		created_at INTEGER NOT NULL,
		updated_at INTEGER NOT NULL,
		UNIQUE(email),
		UNIQUE(username)
	);

	CREATE TABLE posts (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		author_id INTEGER NOT NULL,
		content TEXT,
		image TEXT,
		video TEXT,
		created_at INTEGER NOT NULL,
		updated_at INTEGER NOT NULL,
		likes_count INTEGER NOT NULL DEFAULT 0,
		comments_count INTEGER NOT NULL DEFAULT 0,
		FOREIGN KEY(author_id) REFERENCES users(id)
	);
	CREATE INDEX posts_author_id ON posts(author_id);

	CREATE TABLE likes (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		user_id INTEGER NOT NULL,
		post_id INTEGER NOT NULL,
		created_at INTEGER NOT NULL,
		UNIQUE(user_id, post_id),
		FOREIGN KEY(user_id) REFERENCES users(id),
		FOREIGN KEY(post_id) REFERENCES posts(id)
	);
	CREATE INDEX likes_post_id ON likes(post_id);

	CREATE TABLE follows (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		follower_id INTEGER NOT NULL,
		following_id INTEGER NOT NULL,
		created_at INTEGER NOT NULL,
		UNIQUE(follower_id, following_id),
		FOREIGN KEY(follower_id) REFERENCES users(id),
		FOREIGN KEY(following_id) REFERENCES users(id)
	);
	CREATE INDEX follows_following_id ON follows(following_id);

	CREATE TABLE comments (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		post_id INTEGER NOT NULL,
		user_id INTEGER NOT NULL,
		content TEXT NOT NULL,
		created_at INTEGER NOT NULL,
		updated_at INTEGER NOT NULL,
		FOREIGN KEY(post_id) REFERENCES posts(id),
		FOREIGN KEY(user_id) REFERENCES users(id)
	);
	CREATE INDEX comments_post_id ON comments(post_id);
"#;
