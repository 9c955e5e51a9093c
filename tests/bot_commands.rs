//! Integration tests for command dispatch over a live connection.

mod common;

use common::{FakeServer, bot_settings, start_bot};
use slirc_bot::db::Database;
use std::sync::Arc;
use std::time::Duration;

async fn memory_store() -> Arc<Database> {
    Arc::new(Database::new(":memory:").await.unwrap())
}

#[tokio::test]
async fn hello_replies_in_channel() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (_conn, mut bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    bot.send_raw(":alice!a@host PRIVMSG #test :.hello").await.unwrap();
    assert_eq!(bot.recv().await.unwrap(), "PRIVMSG #test :Hello world!");
}

#[tokio::test]
async fn private_echo_replies_to_sender() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (_conn, mut bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    bot.send_raw(r#":alice!a@host PRIVMSG bot :.echo "New York" 5"#)
        .await
        .unwrap();
    assert_eq!(bot.recv().await.unwrap(), "PRIVMSG alice :New York 5");
}

#[tokio::test]
async fn non_matching_lines_are_silent() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (_conn, mut bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    bot.send_raw(":alice!a@host PRIVMSG #test :hello").await.unwrap();
    bot.send_raw(":alice!a@host PRIVMSG #test :.hellothere").await.unwrap();
    bot.send_raw(":alice!a@host PRIVMSG #test :.echo").await.unwrap();
    bot.send_raw(":alice!a@host NOTICE #test :.hello").await.unwrap();
    bot.expect_silence(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn ping_is_answered() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (_conn, mut bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    bot.send_raw("PING :irc.test").await.unwrap();
    assert_eq!(bot.recv().await.unwrap(), "PONG irc.test");
}

#[tokio::test]
async fn nick_collision_during_registration_retries() {
    let server = FakeServer::bind().await.unwrap();
    let conn = slirc_bot::network::Connection::connect(
        &server.address(),
        bot_settings(Duration::from_secs(5)),
        Arc::new(slirc_bot::commands::Registry::new()),
        memory_store().await,
    )
    .await
    .unwrap();
    let mut bot = server.accept().await.unwrap();

    assert_eq!(bot.recv().await.unwrap(), "NICK bot");
    bot.recv().await.unwrap();
    bot.send_raw(":irc.test 433 * bot :Nickname is already in use")
        .await
        .unwrap();
    assert_eq!(bot.recv().await.unwrap(), "NICK bot_");

    bot.send_raw(":irc.test 001 bot_ :Welcome").await.unwrap();
    assert_eq!(bot.recv().await.unwrap(), "JOIN #test");
    drop(conn);
}

#[tokio::test]
async fn quit_sends_message_and_waits_for_close() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (conn, mut bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    let quitting = tokio::spawn(async move { conn.quit(Some("see you")).await });
    assert_eq!(bot.recv().await.unwrap(), "QUIT :see you");
    bot.send_raw("ERROR :Closing Link: bot (Quit: see you)")
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), quitting)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn server_eof_ends_the_connection() {
    let server = FakeServer::bind().await.unwrap();
    let settings = bot_settings(Duration::from_secs(5));
    let (conn, bot) = start_bot(&server, settings, memory_store().await).await.unwrap();

    drop(bot);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !conn.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}
