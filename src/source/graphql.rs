// src/source/graphql.rs
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Map, Value};

use super::{QueryPage, QueryRequest, Record, SortOrder, Source};
use crate::config::SourceOptions;
use crate::core::net;
use crate::error::{ConfigError, SourceError};

/// GraphQL listing endpoint.
///
/// Every request POSTs the same query text; only the variables change:
/// the range, page size, cursor, sort and one list variable per attribute
/// dimension (named after the dimension).
#[derive(Clone, Debug)]
pub struct GraphqlSource {
    client: Client,
    query: String,
    dimension_names: Vec<String>,
    opts: SourceOptions,
}

impl GraphqlSource {
    pub fn from_options(
        opts: &SourceOptions,
        dimension_names: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        opts.validate()?;
        let query = opts.query_text()?;
        let client = net::client(timeout, &opts.headers)?;
        Ok(Self {
            client,
            query,
            dimension_names,
            opts: opts.clone(),
        })
    }

    pub fn variables(&self, req: &QueryRequest<'_>) -> Value {
        build_variables(&self.opts, &self.dimension_names, req)
    }
}

impl Source for GraphqlSource {
    fn query(&self, req: &QueryRequest<'_>) -> Result<QueryPage, SourceError> {
        let body = json!({
            "query": self.query,
            "variables": self.variables(req),
        });

        let resp = self.client.post(&self.opts.endpoint).json(&body).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let doc: Value = resp.json()?;
        normalize(&doc, &self.opts)
    }
}

/// Request variables for one query.
pub fn build_variables(opts: &SourceOptions, dimension_names: &[String], req: &QueryRequest<'_>) -> Value {
    let mut vars = match &opts.extra_variables {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    vars.insert(
        opts.range_variable.clone(),
        json!({ "min": req.range.lower(), "max": req.range.upper() }),
    );
    vars.insert(opts.page_size_variable.clone(), json!(req.page_size));
    vars.insert(
        opts.cursor_variable.clone(),
        req.cursor.map_or(Value::Null, |c| json!(c)),
    );

    let sort = match req.sort {
        SortOrder::Default => opts.sort_default.as_ref(),
        SortOrder::Alternate => opts.sort_alternate.as_ref(),
    };
    if let Some(sort) = sort {
        vars.insert(opts.sort_variable.clone(), json!(sort));
    }

    if let Some(combo) = req.combo {
        for (name, subset) in dimension_names.iter().zip(combo.subsets()) {
            if !subset.is_empty() {
                vars.insert(name.clone(), json!(subset));
            }
        }
    }

    Value::Object(vars)
}

/// Normalize a GraphQL response envelope into a [`QueryPage`].
///
/// The result object is the first `data` field whose key starts with
/// `result_prefix`. Explicit errors come either as a top-level `errors`
/// array or as a result object whose `__typename` ends in `Error`.
pub fn normalize(doc: &Value, opts: &SourceOptions) -> Result<QueryPage, SourceError> {
    if let Some(errors) = doc.get("errors").and_then(Value::as_array) {
        if let Some(first) = errors.first() {
            let msg = first.get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error");
            return Err(SourceError::Upstream(format!("{msg} ({} error(s))", errors.len())));
        }
    }

    let data = doc.get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::Malformed(s!("missing `data` object")))?;

    let result = data.iter()
        .find(|(key, _)| key.starts_with(&opts.result_prefix))
        .map(|(_, v)| v)
        .ok_or_else(|| SourceError::Malformed(format!("no `data` field starting with `{}`", opts.result_prefix)))?;

    if let Some(typename) = result.get("__typename").and_then(Value::as_str) {
        if typename.ends_with("Error") {
            let msg = result.get("message").and_then(Value::as_str).unwrap_or("");
            return Err(SourceError::Upstream(format!("{typename}: {msg}")));
        }
    }

    let total_hits = result.get("totalHits")
        .and_then(Value::as_u64)
        .ok_or_else(|| SourceError::Malformed(s!("missing or non-numeric `totalHits`")))?;

    // Without pageInfo there is no telling whether this was the last page.
    let page_info = result.get("pageInfo")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::Malformed(s!("missing `pageInfo` object")))?;
    let has_next_page = page_info.get("hasNextPage")
        .and_then(Value::as_bool)
        .ok_or_else(|| SourceError::Malformed(s!("missing or non-boolean `pageInfo.hasNextPage`")))?;
    let end_cursor = page_info.get("endCursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(String::from);

    let records = match result.get(&opts.records_field) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter()
            .map(|item| to_record(item, &opts.id_field))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(SourceError::Malformed(format!("`{}` is not an array", opts.records_field)));
        }
    };

    Ok(QueryPage { total_hits, records, has_next_page, end_cursor })
}

fn to_record(item: &Value, id_path: &str) -> Result<Record, SourceError> {
    let mut cur = item;
    for part in id_path.split('.') {
        cur = cur.get(part)
            .ok_or_else(|| SourceError::Malformed(format!("record without `{id_path}`")))?;
    }
    let id = match cur {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(SourceError::Malformed(format!("`{id_path}` is not a string or number"))),
    };
    Ok(Record::new(id, item.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AttributeCombo, RangeDescriptor};

    fn opts() -> SourceOptions {
        SourceOptions {
            endpoint: s!("https://example.test/graphql"),
            query: Some(s!("query Search { x }")),
            ..SourceOptions::default()
        }
    }

    #[test]
    fn normalizes_prefixed_envelope() {
        let doc = json!({
            "data": {
                "searchProvidersChildCare": {
                    "totalHits": 742,
                    "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
                    "results": [ { "id": "m1", "rate": 18 }, { "id": 22 } ]
                }
            }
        });
        let page = normalize(&doc, &opts()).unwrap();
        assert_eq!(page.total_hits, 742);
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("abc"));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].id, "m1");
        assert_eq!(page.records[1].id, "22");
    }

    #[test]
    fn empty_cursor_and_missing_results() {
        let doc = json!({
            "data": { "searchProvidersSeniorCare": {
                "totalHits": 0,
                "pageInfo": { "hasNextPage": false, "endCursor": "" }
            } }
        });
        let page = normalize(&doc, &opts()).unwrap();
        assert_eq!(page.total_hits, 0);
        assert!(page.records.is_empty());
        assert_eq!(page.end_cursor, None);
    }

    #[test]
    fn errors_array_is_upstream_error() {
        let doc = json!({ "errors": [ { "message": "rate limited" } ], "data": null });
        assert!(matches!(normalize(&doc, &opts()), Err(SourceError::Upstream(m)) if m.contains("rate limited")));
    }

    #[test]
    fn typename_error_is_upstream_error() {
        let doc = json!({
            "data": { "searchProviders": { "__typename": "SearchProvidersError", "message": "bad zip" } }
        });
        assert!(matches!(normalize(&doc, &opts()), Err(SourceError::Upstream(m)) if m.contains("bad zip")));
    }

    #[test]
    fn missing_envelope_is_malformed() {
        let doc = json!({ "data": { "somethingElse": {} } });
        assert!(matches!(normalize(&doc, &opts()), Err(SourceError::Malformed(_))));
        let doc = json!({ "data": { "searchProviders": { "pageInfo": {} } } });
        assert!(matches!(normalize(&doc, &opts()), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn truncated_page_info_is_malformed() {
        let no_info = json!({
            "data": { "searchProviders": { "totalHits": 300, "results": [ { "id": "a" } ] } }
        });
        assert!(matches!(normalize(&no_info, &opts()), Err(SourceError::Malformed(m)) if m.contains("pageInfo")));

        let no_flag = json!({
            "data": { "searchProviders": {
                "totalHits": 300,
                "pageInfo": { "endCursor": "c1" },
                "results": [ { "id": "a" } ]
            } }
        });
        assert!(matches!(normalize(&no_flag, &opts()), Err(SourceError::Malformed(m)) if m.contains("hasNextPage")));

        let stringly = json!({
            "data": { "searchProviders": {
                "totalHits": 300,
                "pageInfo": { "hasNextPage": "true", "endCursor": "c1" },
                "results": []
            } }
        });
        assert!(matches!(normalize(&stringly, &opts()), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn nested_id_path() {
        let mut o = opts();
        o.id_field = s!("member.id");
        let doc = json!({
            "data": { "searchProviders": {
                "totalHits": 1,
                "pageInfo": { "hasNextPage": false },
                "results": [ { "member": { "id": "abc" } } ]
            } }
        });
        assert_eq!(normalize(&doc, &o).unwrap().records[0].id, "abc");

        let bad = json!({ "data": { "searchProviders": {
            "totalHits": 1,
            "pageInfo": { "hasNextPage": false },
            "results": [ {} ]
        } } });
        assert!(matches!(normalize(&bad, &o), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn variables_carry_range_cursor_sort_and_combo() {
        let mut o = opts();
        o.extra_variables = json!({ "zipcode": "10001" });
        let names = vec![s!("tasks"), s!("skills")];
        let combo = AttributeCombo::new(vec![vec![s!("cooking")], vec![]]);
        let req = QueryRequest {
            range: RangeDescriptor::new(15, 20).unwrap(),
            combo: Some(&combo),
            page_size: 10,
            cursor: Some("c9"),
            sort: SortOrder::Alternate,
        };
        let vars = build_variables(&o, &names, &req);
        assert_eq!(vars["zipcode"], "10001");
        assert_eq!(vars["payRange"], json!({ "min": 15, "max": 20 }));
        assert_eq!(vars["pageSize"], 10);
        assert_eq!(vars["after"], "c9");
        assert_eq!(vars["sortBy"], "DISTANCE_ASC");
        assert_eq!(vars["tasks"], json!(["cooking"]));
        assert!(vars.get("skills").is_none());
    }

    #[test]
    fn first_page_has_null_cursor_and_no_default_sort() {
        let req = QueryRequest {
            range: RangeDescriptor::point(7),
            combo: None,
            page_size: 1,
            cursor: None,
            sort: SortOrder::Default,
        };
        let vars = build_variables(&opts(), &[], &req);
        assert!(vars["after"].is_null());
        assert!(vars.get("sortBy").is_none());
    }
}
