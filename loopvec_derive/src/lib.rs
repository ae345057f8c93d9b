use inflector::Inflector;
use proc_macro::TokenStream;
use quote::quote;
use syn::*;

fn display_arm(name: &Ident, variant: &Variant) -> proc_macro2::TokenStream {
	let variant_name = &variant.ident;
	for attr in &variant.attrs {
		if attr.path().is_ident("style") {
			return match attr.parse_args::<LitStr>() {
				Ok(lit_str) => {
					let val = lit_str.value();
					quote! {
						#name::#variant_name => write!(f, "{}", #val)
					}
				}
				Err(_) => {
					Error::new_spanned(attr, "Expected a string literal")
						.to_compile_error()
				}
			};
		}
	}
	let variant_str = variant_name.to_string().to_snake_case();
	quote! {
		#name::#variant_name => write!(f, "{}", #variant_str)
	}
}

/// Display of a fieldless enum as the snake_case variant name, e.g. `Fadd`
/// prints `fadd`. `#[style("sdiv")]` overrides a single variant.
#[proc_macro_derive(LowerDisplay, attributes(style))]
pub fn display_lowercase(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	let name = input.ident;
	let Data::Enum(DataEnum { variants, .. }) = input.data else {
		return Error::new_spanned(name, "LowerDisplay is only defined for enums")
			.to_compile_error()
			.into();
	};
	let cases = variants.iter().map(|v| display_arm(&name, v));

	let expanded = quote! {
		impl std::fmt::Display for #name {
			fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
				match self {
					#( #cases, )*
				}
			}
		}
	};

	TokenStream::from(expanded)
}
