//! Behaviour checks shared by the in-memory and MongoDB test suites.

#![allow(dead_code)]

use domain_products::{Datastore, Product, ProductParams, ProductService};
use test_utils::assertions::{assert_some, assert_sorted};

pub fn params(name: &str) -> ProductParams {
    ProductParams {
        name: Some(name.to_string()),
        downcase_name: Some(name.to_lowercase()),
        image_url: Some(format!("http://x/{}.png", name.to_lowercase())),
    }
}

pub async fn create<D: Datastore + ?Sized>(service: &ProductService<D>, name: &str) -> Product {
    let mut product = Product::new(params(name));
    assert!(service.save(&mut product).await.unwrap(), "save {name}");
    product
}

pub async fn saved_product_reads_back<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let product = create(service, "Gopher").await;
    let id = assert_some(product.id, "saved product id");

    let found = assert_some(service.find(id).await.unwrap(), "find saved product");
    assert_eq!(found.id, Some(id));
    assert_eq!(found.name, "Gopher");
    assert_eq!(found.downcase_name, "gopher");
    assert_eq!(found.image_url, "http://x/gopher.png");
}

pub async fn ids_are_distinct<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let a = create(service, "Alpha").await;
    let b = create(service, "Beta").await;
    assert_ne!(a.id, b.id);
}

pub async fn invalid_product_is_not_stored<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let mut product = Product::new(ProductParams {
        name: Some("Nameless".to_string()),
        downcase_name: Some("nameless".to_string()),
        image_url: Some("   ".to_string()),
    });

    assert!(!service.save(&mut product).await.unwrap());
    assert!(product.id.is_none());
    assert!(service.autosearch("nameless").await.unwrap().is_empty());
}

pub async fn update_persists_changes<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let mut product = create(service, "Widget").await;
    let id = assert_some(product.id, "id");

    let changes = ProductParams {
        name: Some("Gadget".to_string()),
        downcase_name: Some("gadget".to_string()),
        image_url: None,
    };
    assert!(service.update(&mut product, changes).await.unwrap());
    assert_eq!(product.id, Some(id));

    let found = assert_some(service.find(id).await.unwrap(), "updated product");
    assert_eq!(found.name, "Gadget");
    assert_eq!(found.image_url, "http://x/widget.png");
}

pub async fn destroy_is_idempotent<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let product = create(service, "Ephemeral").await;
    let id = assert_some(product.id, "id");

    service.destroy(id).await.unwrap();
    assert!(service.find(id).await.unwrap().is_none());
    service.destroy(id).await.unwrap();
}

/// Walks every page and checks the pages partition the stored products.
pub async fn pages_cover_everything_once<D: Datastore + ?Sized>(service: &ProductService<D>) {
    let mut expected = Vec::new();
    for i in 0..7 {
        expected.push(create(service, &format!("Page{}", i)).await.id.unwrap());
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = service.query(3, cursor.as_deref()).await.unwrap();
        assert!(page.products.len() <= 3);
        seen.extend(page.products.iter().map(|p| p.id.unwrap()));
        match page.cursor {
            Some(next) => {
                assert_eq!(page.products.len(), 3, "cursor only on a full page");
                cursor = Some(next);
            }
            None => break,
        }
    }

    assert_sorted(&seen, "ids in store order");
    assert_eq!(seen, expected);
}

pub async fn autosearch_matches_prefix<D: Datastore + ?Sized>(service: &ProductService<D>) {
    for name in ["Bazooka", "Apple", "Banana", "Bb", "Ba", "Cherry"] {
        create(service, name).await;
    }

    let found = service.autosearch("ba").await.unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.downcase_name.as_str()).collect();
    assert_eq!(names, ["ba", "banana", "bazooka"]);

    // The term is not lower-cased.
    assert!(service.autosearch("BA").await.unwrap().is_empty());
}

pub async fn autosearch_returns_at_most_five<D: Datastore + ?Sized>(service: &ProductService<D>) {
    for i in (0..9).rev() {
        create(service, &format!("Lamp{}", i)).await;
    }

    let found = service.autosearch("lamp").await.unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.downcase_name.as_str()).collect();
    assert_eq!(names, ["lamp0", "lamp1", "lamp2", "lamp3", "lamp4"]);
}

pub async fn empty_phrase_matches_everything<D: Datastore + ?Sized>(service: &ProductService<D>) {
    create(service, "Zebra").await;
    create(service, "Aardvark").await;

    let found = service.autosearch("").await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].downcase_name, "aardvark");
}
