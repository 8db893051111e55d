use cqrs_application::command::Command;
use cqrs_macros::command;

#[command(output = u64, name = "catalog.create_product")]
struct CreateProduct {
    name: String,
}

#[command]
struct Ping;

fn main() {
    assert_eq!(CreateProduct::NAME, "catalog.create_product");
    assert_eq!(Ping::NAME, "Ping");

    let cmd = CreateProduct { name: "pen".into() };
    assert!(format!("{cmd:?}").contains("pen"));
    assert_eq!(cmd.cache_key(), None);

    let _: <Ping as Command>::Output = ();
    let _: <CreateProduct as Command>::Output = 7_u64;
}
