//! Tests for `#[derive(Params)]`.

use assert2::check;
use formwire::{ParameterMap, ParameterValue, Params, ToParameters, build_query_string};

#[derive(Params)]
struct Search {
    q: String,
    page: Option<u32>,
    tags: Vec<String>,
}

#[test]
fn fields_in_declaration_order() {
    let params = Search {
        q: "rust".to_string(),
        page: Some(2),
        tags: vec!["a".to_string(), "b".to_string()],
    }
    .to_parameters();

    let query = build_query_string(&params).expect("query");
    check!(query == "q=rust&page=2&tags%5B%5D=a&tags%5B%5D=b");
}

#[test]
fn none_is_omitted() {
    let params = Search {
        q: "rust".to_string(),
        page: None,
        tags: Vec::new(),
    }
    .to_parameters();

    check!(params.get("page").is_none());
    check!(build_query_string(&params).expect("query") == "q=rust");
}

#[derive(Params)]
#[params(rename_all = "camelCase")]
struct Profile {
    display_name: String,
    #[params(rename = "mail")]
    email_address: String,
    #[params(skip)]
    #[allow(dead_code)]
    session_token: String,
    #[params(keep_none)]
    nick_name: Option<String>,
}

#[test]
fn renames_and_skips() {
    let params = Profile {
        display_name: "Ada".to_string(),
        email_address: "ada@example.com".to_string(),
        session_token: "secret".to_string(),
        nick_name: None,
    }
    .to_parameters();

    let expected: ParameterValue = ParameterMap::new()
        .with("displayName", "Ada")
        .with("mail", "ada@example.com")
        .with("nickName", ParameterValue::Null)
        .into();
    check!(params == expected);
    check!(build_query_string(&params).expect("query") == "displayName=Ada&mail=ada%40example.com&nickName");
}

#[derive(Params)]
struct Address {
    city: String,
    zip: u32,
}

#[derive(Params)]
struct Order {
    id: u64,
    paid: bool,
    shipping: Address,
    items: Vec<Address>,
}

#[test]
fn nested_types_become_maps() {
    let params = Order {
        id: 7,
        paid: true,
        shipping: Address {
            city: "Lyon".to_string(),
            zip: 69000,
        },
        items: vec![Address {
            city: "Nice".to_string(),
            zip: 6000,
        }],
    }
    .to_parameters();

    let query = build_query_string(&params).expect("query");
    check!(
        query
            == "id=7&paid=1&shipping%5Bcity%5D=Lyon&shipping%5Bzip%5D=69000\
                &items%5B%5D%5Bcity%5D=Nice&items%5B%5D%5Bzip%5D=6000"
    );
}

#[derive(Params)]
struct Borrowed<'a> {
    name: &'a str,
}

#[test]
fn generic_lifetimes() {
    let name = String::from("x");
    let params = Borrowed { name: &name }.to_parameters();
    check!(params.get("name").and_then(ParameterValue::as_str) == Some("x"));
}
