/// Window-level side effects: page navigation and blocking alerts.
pub trait Browser {
    fn navigate(&self, url: &str);

    fn alert(&self, message: &str);
}

impl<B: Browser + ?Sized> Browser for &B {
    fn navigate(&self, url: &str) {
        (**self).navigate(url);
    }

    fn alert(&self, message: &str) {
        (**self).alert(message);
    }
}
