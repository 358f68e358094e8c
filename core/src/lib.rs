/*!
# rolodex-core

In-memory pipeline for browsing a large contact directory: bulk-load the
dataset, show the first rows immediately while the remainder streams in,
build a search index in the background, and filter live with debounced,
cancellable substring search.

## Features

- **Progressive display**: an initial slice is published at once; the rest
  follows in bounded batches that yield to the consumer
- **Background indexing**: per-row search strings are computed off the
  display path; filtering falls back to raw fields until the index is up
- **Debounced, superseding search**: a burst of keystrokes coalesces into
  one pass, and a newer pass always cancels the older one
- **Lazy expansion**: address rows are materialized on first expansion and
  cached on their parent

## Example

```rust,no_run
use rolodex_core::{Session, SessionConfig};

#[tokio::main]
async fn main() -> rolodex_core::Result<()> {
    let session = Session::new(SessionConfig::default())?;
    session.load_from_path("contacts.json").await?;

    session.set_query("marseille").await;

    let (filtered, total) = session.counts().await;
    println!("{filtered} of {total} contacts match");

    session.shutdown();
    Ok(())
}
```
*/

mod cancel;
mod config;
mod display;
mod error;
mod expand;
mod filter;
mod index;
mod materialize;
mod model;
mod row;
mod sequence;
mod session;
mod source;

pub use config::SessionConfig;
pub use error::Result;
pub use error::RolodexError;
pub use index::IndexReport;
pub use model::Address;
pub use model::Contact;
pub use model::ContactStore;
pub use row::Row;
pub use row::RowTag;
pub use sequence::SequenceChange;
pub use sequence::SequenceStamp;
pub use session::LoadReport;
pub use session::Session;
pub use session::StatsSnapshot;
pub use source::parse_contacts;
pub use source::read_contacts;
