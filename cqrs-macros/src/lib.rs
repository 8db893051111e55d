//! 请求与领域事件的声明宏
//!
//! 以编译期声明替代运行时类型扫描：被标注的类型直接实现对应契约，
//! 注册时由泛型参数确定请求/结果类型。
use proc_macro::TokenStream;

mod domain_event;
mod request;
mod utils;

use request::RequestKind;

/// 命令宏
/// - 为结构体实现 `::cqrs_application::command::Command`
/// - 参数：`output = Type`（默认 `()`）、`name = "..."`（默认结构体名）、`cacheable`
///
/// ```ignore
/// #[command(output = ProductId, name = "catalog.create_product")]
/// struct CreateProduct {
///     name: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn command(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(RequestKind::Command, attr, item)
}

/// 查询宏
/// - 为结构体实现 `::cqrs_application::query::Query`
/// - 参数同 [`command`]；`cacheable` 时以 Debug 输出作为缓存键
#[proc_macro_attribute]
pub fn query(attr: TokenStream, item: TokenStream) -> TokenStream {
    request::expand(RequestKind::Query, attr, item)
}

/// 领域事件宏
/// - 追加 `event_date_time` 字段（若缺失）与 Debug/Clone 派生
/// - 实现 `::cqrs_domain::domain_event::DomainEvent`，`EVENT_TYPE` 默认结构体名
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}
