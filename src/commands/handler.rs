//! Command Handler
//!
//! Turns parsed commands into [`Shortener`] calls and their results into
//! RESP replies.
//!
//! ## Supported Commands
//!
//! - `SHORTEN target [ALIAS alias] [TTL seconds]` - Create an alias.
//!   Replies `[alias, short_url]`.
//! - `RESOLVE alias` - Return the target and count the access
//! - `STATS alias` - Replies
//!   `[alias, target, access_count, [access_unix_ms...], expires_unix_ms]`
//! - `UPDATE alias [ALIAS new_alias] [TTL seconds]` - Rename and/or re-arm.
//!   Replies `[alias, expires_unix_ms]`.
//! - `REMOVE alias` - Delete an alias
//! - `PING [message]`, `INFO`, `QUIT`
//!
//! ## Errors
//!
//! Store errors come back as RESP errors whose first word names the kind:
//! `NOTFOUND`, `CONFLICT`, `INVALID`, `NOOP` or `ERR`.

use crate::error::StoreError;
use crate::protocol::RespValue;
use crate::service::Shortener;
use bytes::Bytes;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Handles commands against a shared [`Shortener`].
#[derive(Debug, Clone)]
pub struct CommandHandler {
    shortener: Shortener,
    /// Prefix for the short URLs reported by SHORTEN
    base_url: String,
    /// Server start time for INFO command
    start_time: Instant,
}

/// Optional `ALIAS` / `TTL` arguments shared by SHORTEN and UPDATE.
#[derive(Debug, Default, PartialEq, Eq)]
struct AliasOptions {
    alias: Option<String>,
    ttl_seconds: Option<i64>,
}

impl CommandHandler {
    pub fn new(shortener: Shortener, base_url: impl Into<String>) -> Self {
        Self {
            shortener,
            base_url: base_url.into(),
            start_time: Instant::now(),
        }
    }

    /// Executes a command and returns the reply.
    pub fn execute(&self, args: &[Bytes]) -> RespValue {
        let Some((name, rest)) = args.split_first() else {
            return RespValue::error("ERR empty command");
        };

        let name = match std::str::from_utf8(name) {
            Ok(name) => name.to_ascii_uppercase(),
            Err(_) => return RespValue::error("ERR invalid command name"),
        };

        self.dispatch(&name, rest)
    }

    /// Whether `args` is a QUIT command.
    pub fn is_quit(args: &[Bytes]) -> bool {
        args.first()
            .map(|name| name.eq_ignore_ascii_case(b"QUIT"))
            .unwrap_or(false)
    }

    fn dispatch(&self, cmd: &str, args: &[Bytes]) -> RespValue {
        match cmd {
            "SHORTEN" => self.cmd_shorten(args),
            "RESOLVE" => self.cmd_resolve(args),
            "STATS" => self.cmd_stats(args),
            "UPDATE" => self.cmd_update(args),
            "REMOVE" => self.cmd_remove(args),
            "PING" => self.cmd_ping(args),
            "INFO" => self.cmd_info(args),
            "QUIT" => RespValue::ok(),
            _ => RespValue::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    fn wrong_args(cmd: &str) -> RespValue {
        RespValue::error(format!(
            "ERR wrong number of arguments for '{}' command",
            cmd.to_lowercase()
        ))
    }

    fn get_str(value: &Bytes) -> Result<&str, RespValue> {
        std::str::from_utf8(value).map_err(|_| RespValue::error("ERR argument is not valid UTF-8"))
    }

    /// Parses `[ALIAS a] [TTL n]` in any order.
    fn parse_options(args: &[Bytes]) -> Result<AliasOptions, RespValue> {
        let mut options = AliasOptions::default();
        let mut iter = args.iter();

        while let Some(flag) = iter.next() {
            let value = iter.next().ok_or_else(|| RespValue::error("ERR syntax error"))?;
            let value = Self::get_str(value)?;

            if flag.eq_ignore_ascii_case(b"ALIAS") {
                options.alias = Some(value.to_string());
            } else if flag.eq_ignore_ascii_case(b"TTL") {
                let secs = value
                    .parse()
                    .map_err(|_| RespValue::error("ERR ttl is not an integer or out of range"))?;
                options.ttl_seconds = Some(secs);
            } else {
                return Err(RespValue::error("ERR syntax error"));
            }
        }

        Ok(options)
    }

    fn store_error(err: StoreError) -> RespValue {
        let kind = match err {
            StoreError::NotFound => "NOTFOUND",
            StoreError::AliasConflict => "CONFLICT",
            StoreError::InvalidTarget | StoreError::InvalidAliasFormat => "INVALID",
            StoreError::NothingToUpdate => "NOOP",
            StoreError::AliasGenerationFailed { .. } => "ERR",
        };
        RespValue::error(format!("{} {}", kind, err))
    }

    /// Converts a store instant to milliseconds since the Unix epoch.
    fn unix_millis(&self, at: Instant) -> i64 {
        let now = self.shortener.store().now();
        let wall = SystemTime::now();
        let wall = if at >= now {
            wall.checked_add(at - now)
        } else {
            wall.checked_sub(now - at)
        };
        wall.and_then(|wall| wall.duration_since(UNIX_EPOCH).ok())
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    fn short_url(&self, alias: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), alias)
    }

    // ========================================================================
    // Alias commands
    // ========================================================================

    /// SHORTEN target [ALIAS alias] [TTL seconds]
    fn cmd_shorten(&self, args: &[Bytes]) -> RespValue {
        let Some((target, rest)) = args.split_first() else {
            return Self::wrong_args("SHORTEN");
        };

        let result = Self::get_str(target).and_then(|target| {
            let options = Self::parse_options(rest)?;
            self.shortener
                .create(options.alias.as_deref(), target, options.ttl_seconds)
                .map_err(Self::store_error)
        });

        match result {
            Ok(created) => {
                let short_url = self.short_url(&created.alias);
                RespValue::array(vec![
                    RespValue::bulk_string(created.alias),
                    RespValue::bulk_string(short_url),
                ])
            }
            Err(reply) => reply,
        }
    }

    /// RESOLVE alias
    fn cmd_resolve(&self, args: &[Bytes]) -> RespValue {
        if args.len() != 1 {
            return Self::wrong_args("RESOLVE");
        }

        let result = Self::get_str(&args[0])
            .and_then(|alias| self.shortener.resolve(alias).map_err(Self::store_error));

        match result {
            Ok(target) => RespValue::bulk_string(target),
            Err(reply) => reply,
        }
    }

    /// STATS alias
    fn cmd_stats(&self, args: &[Bytes]) -> RespValue {
        if args.len() != 1 {
            return Self::wrong_args("STATS");
        }

        let result = Self::get_str(&args[0])
            .and_then(|alias| self.shortener.get_stats(alias).map_err(Self::store_error));

        match result {
            Ok(stats) => {
                let times = stats
                    .access_times
                    .iter()
                    .map(|at| RespValue::integer(self.unix_millis(*at)))
                    .collect();
                RespValue::array(vec![
                    RespValue::bulk_string(stats.alias),
                    RespValue::bulk_string(stats.target),
                    RespValue::integer(stats.access_count as i64),
                    RespValue::array(times),
                    RespValue::integer(self.unix_millis(stats.expires_at)),
                ])
            }
            Err(reply) => reply,
        }
    }

    /// UPDATE alias [ALIAS new_alias] [TTL seconds]
    fn cmd_update(&self, args: &[Bytes]) -> RespValue {
        let Some((alias, rest)) = args.split_first() else {
            return Self::wrong_args("UPDATE");
        };

        let result = Self::get_str(alias).and_then(|alias| {
            let options = Self::parse_options(rest)?;
            self.shortener
                .update(alias, options.alias.as_deref(), options.ttl_seconds)
                .map_err(Self::store_error)
        });

        match result {
            Ok(updated) => RespValue::array(vec![
                RespValue::bulk_string(updated.alias),
                RespValue::integer(self.unix_millis(updated.expires_at)),
            ]),
            Err(reply) => reply,
        }
    }

    /// REMOVE alias
    fn cmd_remove(&self, args: &[Bytes]) -> RespValue {
        if args.len() != 1 {
            return Self::wrong_args("REMOVE");
        }

        let result = Self::get_str(&args[0])
            .and_then(|alias| self.shortener.remove(alias).map_err(Self::store_error));

        match result {
            Ok(removed) if removed.was_expired => RespValue::simple_string("Deleted (was expired)"),
            Ok(_) => RespValue::simple_string("Deleted"),
            Err(reply) => reply,
        }
    }

    // ========================================================================
    // Server commands
    // ========================================================================

    /// PING [message]
    fn cmd_ping(&self, args: &[Bytes]) -> RespValue {
        match args {
            [] => RespValue::pong(),
            [message] => RespValue::bulk_string(message.clone()),
            _ => Self::wrong_args("PING"),
        }
    }

    /// INFO
    fn cmd_info(&self, _args: &[Bytes]) -> RespValue {
        let stats = self.shortener.store().stats();
        let config = self.shortener.store().config();

        let info = format!(
            "# Server\r\n\
             flashlink_version:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n\
             # Config\r\n\
             default_ttl_seconds:{}\r\n\
             access_log_capacity:{}\r\n\
             sweep_interval_ms:{}\r\n\
             \r\n\
             # Store\r\n\
             aliases:{}\r\n\
             created:{}\r\n\
             resolved:{}\r\n\
             removed:{}\r\n\
             expired_on_read:{}\r\n\
             expired_by_sweeper:{}\r\n\
             stale_index_entries_discarded:{}\r\n\
             index_entries:{}\r\n",
            crate::VERSION,
            self.start_time.elapsed().as_secs(),
            config.default_ttl.as_secs(),
            config.access_log_capacity,
            config.sweep_interval.as_millis(),
            stats.aliases,
            stats.created,
            stats.resolved,
            stats.removed,
            stats.expired_on_read,
            stats.expired_by_sweeper,
            stats.stale_discarded,
            stats.index_entries,
        );

        RespValue::bulk_string(info)
    }
}
