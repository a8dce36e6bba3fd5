//! Scripts evaluated inside rendered pages.

/// Prepares an article for printing.
///
/// Images and figures are boxed together with their captions and marked as
/// unbreakable; the first "Resources" / "Related" / "See also" section is
/// moved into a block that always starts on a new page.
pub const PAGINATION_FIXUPS: &str = r#"
    const avoidBreak = (el) => {
        el.style.pageBreakInside = 'avoid';
        el.style.breakInside = 'avoid';
    };

    const keepWithCaption = (img) => {
        const figure = img.closest('figure');
        const container = figure || img.parentElement;
        if (!container || !container.parentNode) {
            return;
        }
        if (container.parentElement && container.parentElement.hasAttribute('data-image-wrapper')) {
            return;
        }
        avoidBreak(container);

        const wrapper = document.createElement('div');
        wrapper.setAttribute('data-image-wrapper', 'true');
        wrapper.style.display = 'flex';
        wrapper.style.flexDirection = 'column';
        wrapper.style.margin = '1em 0';
        avoidBreak(wrapper);
        container.parentNode.insertBefore(wrapper, container);
        wrapper.appendChild(container);

        if (!figure) {
            const next = wrapper.nextElementSibling;
            if (next && next.matches('.caption, [class*="caption"], figcaption')) {
                wrapper.appendChild(next);
            }
        }
    };

    document.querySelectorAll('img, [role="img"], svg').forEach(keepWithCaption);
    document
        .querySelectorAll('.graphics-container, [class*="figure"], [class*="image"]')
        .forEach(avoidBreak);

    const headings = Array.from(document.querySelectorAll('h1, h2, h3, h4, h5, h6'));
    const resources = headings.find((h) => {
        const text = (h.textContent || '').toLowerCase();
        return text.includes('resource') || text.includes('related') || text.includes('see also');
    });

    if (resources && resources.parentNode) {
        const block = document.createElement('div');
        block.style.pageBreakBefore = 'always';
        block.style.breakBefore = 'page';

        const moved = [];
        let current = resources;
        while (current) {
            const next = current.nextElementSibling;
            moved.push(current);
            if (next && next.matches('h1')) {
                break;
            }
            current = next;
        }

        resources.parentNode.insertBefore(block, resources);
        moved.forEach((node) => block.appendChild(node));
    }
    return true;
"#;

/// Returns the bounding box of every contents row, measured against the
/// whole document in CSS pixels: `[{seq, left, top, right, bottom}]`.
pub const CONTENTS_ROW_RECTS: &str = r#"
    const rows = Array.from(document.querySelectorAll('.row[data-seq]'));
    return rows.map((row) => {
        const rect = row.getBoundingClientRect();
        return {
            seq: parseInt(row.getAttribute('data-seq') || '0', 10),
            left: rect.left + window.scrollX,
            top: rect.top + window.scrollY,
            right: rect.right + window.scrollX,
            bottom: rect.bottom + window.scrollY,
        };
    });
"#;
