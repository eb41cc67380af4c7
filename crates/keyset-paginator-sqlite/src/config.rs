//! Connection pool settings.

use std::time::Duration;

/// Pool configuration for [`SqliteDatabase`](crate::SqliteDatabase).
///
/// ```
/// use keyset_paginator_sqlite::SqliteDatabaseConfig;
/// use std::time::Duration;
///
/// let config = SqliteDatabaseConfig {
///    idle_timeout: Duration::from_secs(60),
///    ..Default::default()
/// };
/// assert_eq!(config.max_read_connections, 6);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDatabaseConfig {
   /// Size of the read-only pool that page queries run on
   ///
   /// Default: 6
   pub max_read_connections: u32,

   /// How long an unused connection stays open, for both pools
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         max_read_connections: 6,
         idle_timeout: Duration::from_secs(30),
      }
   }
}
