use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One purchasable line item in an order's cart snapshot.
///
/// The snapshot is written once at checkout submission and embedded verbatim
/// in the order row; prices, names and URLs are frozen there and deliberately
/// not re-derived from the catalog afterwards. The two shapes carry their own
/// required fields instead of sharing an ad-hoc dynamic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartUnit {
    Product(ProductUnit),
    Package(PackageUnit),
}

/// A single photo bought with one or more product-variation options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductUnit {
    pub institution_id: Uuid,
    pub academic_year_id: Uuid,
    pub course_id: Uuid,
    pub album_id: Uuid,
    pub photo: PhotoRef,
    #[validate(length(min = 1, message = "At least one variation option is required"))]
    pub options: Vec<VariationChoice>,
}

/// A package purchase bundling albums; `items` snapshots the albums and
/// photos included at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct PackageUnit {
    pub package_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_downloadable: bool,
    #[validate(length(min = 1, message = "A package must contain at least one item"))]
    pub items: Vec<PackageItem>,
}

/// One album's worth of photos inside a package unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PackageItem {
    pub institution_id: Uuid,
    pub academic_year_id: Uuid,
    pub course_id: Uuid,
    pub album_id: Uuid,
    pub photos: Vec<PhotoRef>,
    /// Option flags used when the package itself is not downloadable.
    #[serde(default)]
    pub options: Vec<VariationChoice>,
}

/// A chosen product-variation option, price frozen at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VariationChoice {
    pub variation_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub is_downloadable: bool,
}

/// A photo snapshot carried inside cart units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoRef {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub storage_key: String,
}

/// A download entitlement persisted on the user record. Field names are the
/// client-facing contract and must stay camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub photo_id: Uuid,
    pub photo_url: String,
    pub photo_name: String,
    pub download_url: String,
}

/// De-duplicated catalog ids referenced anywhere in a cart, used by the order
/// builder's existence/enablement check.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CartRefs {
    pub institutions: BTreeSet<Uuid>,
    pub academic_years: BTreeSet<Uuid>,
    pub courses: BTreeSet<Uuid>,
    pub albums: BTreeSet<Uuid>,
}

impl CartUnit {
    /// The amount this unit contributes to the order subtotal.
    pub fn amount(&self) -> Decimal {
        match self {
            CartUnit::Product(unit) => unit.options.iter().map(|o| o.price).sum(),
            CartUnit::Package(unit) => unit.price,
        }
    }

    /// Human-facing description for the flattened reporting row.
    pub fn description(&self) -> String {
        match self {
            CartUnit::Product(unit) => {
                let options = unit
                    .options
                    .iter()
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} ({})", unit.photo.name, options)
            }
            CartUnit::Package(unit) => format!("Package: {}", unit.name),
        }
    }

    /// Whether any part of this unit grants a download entitlement.
    pub fn grants_download(&self) -> bool {
        !self.entitled_photos().is_empty()
    }

    /// Structural validity of the snapshot itself (non-empty options/items).
    pub fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            CartUnit::Product(unit) => Validate::validate(unit),
            CartUnit::Package(unit) => Validate::validate(unit),
        }
    }

    /// The photos a successful payment for this unit entitles the buyer to.
    ///
    /// Product unit: its photo, iff any chosen option is flagged downloadable.
    /// Package unit: every photo of every item when the package itself is
    /// downloadable; otherwise each item falls back to its own option flags.
    pub fn entitled_photos(&self) -> Vec<&PhotoRef> {
        match self {
            CartUnit::Product(unit) => {
                if unit.options.iter().any(|o| o.is_downloadable) {
                    vec![&unit.photo]
                } else {
                    Vec::new()
                }
            }
            CartUnit::Package(unit) => {
                if unit.is_downloadable {
                    unit.items.iter().flat_map(|item| &item.photos).collect()
                } else {
                    unit.items
                        .iter()
                        .filter(|item| item.options.iter().any(|o| o.is_downloadable))
                        .flat_map(|item| &item.photos)
                        .collect()
                }
            }
        }
    }

    fn collect_refs(&self, refs: &mut CartRefs) {
        match self {
            CartUnit::Product(unit) => {
                refs.institutions.insert(unit.institution_id);
                refs.academic_years.insert(unit.academic_year_id);
                refs.courses.insert(unit.course_id);
                refs.albums.insert(unit.album_id);
            }
            CartUnit::Package(unit) => {
                for item in &unit.items {
                    refs.institutions.insert(item.institution_id);
                    refs.academic_years.insert(item.academic_year_id);
                    refs.courses.insert(item.course_id);
                    refs.albums.insert(item.album_id);
                }
            }
        }
    }
}

/// Collects the de-duplicated referenced id sets across a whole cart.
pub fn cart_refs(cart: &[CartUnit]) -> CartRefs {
    let mut refs = CartRefs::default();
    for unit in cart {
        unit.collect_refs(&mut refs);
    }
    refs
}

/// Total of all unit amounts (the order subtotal, excluding shipping).
pub fn cart_total(cart: &[CartUnit]) -> Decimal {
    cart.iter().map(CartUnit::amount).sum()
}

/// Merges newly granted entitlements into a user's existing list,
/// de-duplicating by photo id. Existing entries win; within the new batch the
/// first occurrence of a photo id is canonical. The result always contains
/// every pre-existing entry.
pub fn merge_entitlements(existing: &[Entitlement], new: Vec<Entitlement>) -> Vec<Entitlement> {
    let mut seen: BTreeSet<Uuid> = existing.iter().map(|e| e.photo_id).collect();
    let mut merged = existing.to_vec();
    for entitlement in new {
        if seen.insert(entitlement.photo_id) {
            merged.push(entitlement);
        }
    }
    merged
}
