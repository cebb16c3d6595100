/*!
Pagination à taille fixe d'une collection déjà ordonnée

Pages numérotées à partir de 1. Sans état : une page inexistante donne une
tranche vide et `clamped_page` indique la page valide la plus proche.
*/

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Nombre d'éléments, toutes pages confondues
    pub total_count: usize,
    /// `0` pour une collection vide
    pub total_pages: usize,
    /// Page demandée
    pub page: usize,
    /// Page existante la plus proche (au moins 1)
    pub clamped_page: usize,
    /// Position du premier élément de la page dans la collection complète
    pub offset: usize,
}

impl<T> Page<T> {
    /// Rang (base 1) dans la collection complète de l'élément `index` de la page
    pub fn global_rank(&self, index: usize) -> usize {
        self.offset + index + 1
    }

    pub fn is_out_of_range(&self) -> bool {
        self.page == 0 || self.page > self.total_pages
    }
}

pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1))
}

/// Découpe la page `current_page` de `page_size` éléments.
/// Un `page_size` nul vaut 1.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, current_page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let clamped_page = current_page.clamp(1, total_pages.max(1));

    let offset = current_page.saturating_sub(1).saturating_mul(page_size);
    let page_items = if current_page == 0 || offset >= items.len() {
        Vec::new()
    } else {
        let end = offset.saturating_add(page_size).min(items.len());
        items[offset..end].to_vec()
    };

    Page {
        items: page_items,
        total_count: items.len(),
        total_pages,
        page: current_page,
        clamped_page,
        offset,
    }
}

/// Rang (base 1) du premier élément vérifiant `predicate`
pub fn rank_of<T, F>(items: &[T], predicate: F) -> Option<usize>
where
    F: FnMut(&T) -> bool,
{
    items.iter().position(predicate).map(|index| index + 1)
}
