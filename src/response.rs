use serde::{Deserialize, Deserializer, Serialize};

/// One page of a paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn single(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

// Endpoints without pagination answer with a bare array.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Paginated {
                count: u64,
                #[serde(default)]
                next: Option<String>,
                #[serde(default)]
                previous: Option<String>,
                results: Vec<T>,
            },
            Plain(Vec<T>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Paginated {
                count,
                next,
                previous,
                results,
            } => Page {
                count,
                next,
                previous,
                results,
            },
            Repr::Plain(results) => Page::single(results),
        })
    }
}
