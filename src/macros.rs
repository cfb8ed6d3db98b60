macro_rules! dummy {
    ($t:tt) => {
        ()
    };
}

/// Defines an index enum for one of the register families (filters, masks,
/// buffers). The family itself supplies the address arithmetic.
macro_rules! bank_def {
    (
        $(#[doc = $doc:expr])*
        $name:ident {
            $(
                $(#[doc = $v_doc:expr])*
                $variant:ident = $idx:literal
            ),*
        }
    ) => {
        $(#[doc = $doc])*
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[cfg_attr(feature = "ufmt", derive(ufmt::derive::uDebug))]
        pub enum $name {
            $(
                $(#[doc = $v_doc])*
                $variant = $idx,
            )*
        }

        impl $name {
            #[doc = concat!("All valid options for [`", stringify!($name), "`].")]
            pub const ALL: [Self; <[()]>::len(&[$(dummy!($variant)),*])] =
                [$(Self::$variant),*];

            #[doc = concat!("Index of the [`", stringify!($name), "`] within its family.")]
            #[inline]
            pub const fn index(self) -> u8 {
                self as u8
            }
        }
    };
}

// Log macros forwarding to `defmt` when the feature is enabled. Without it the
// arguments are only borrowed so call sites stay warning free.

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($s $(, $x)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($(&$x),*);
    }};
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($s $(, $x)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($(&$x),*);
    }};
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($s $(, $x)*);
        #[cfg(not(feature = "defmt"))]
        let _ = ($(&$x),*);
    }};
}
